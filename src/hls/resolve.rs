//! Origin Resolver: inbound request path → absolute upstream URL.

use crate::config::{Config, MOUNT_POINT};
use crate::error::ProxyError;
use url::Url;

/// Build the absolute upstream URL for an inbound request under the mount
/// point.
///
/// `path` is the wildcard remainder after `/hls/` (no leading slash);
/// `query` is the inbound query string, preserved verbatim. The mount
/// prefix is kept or stripped according to configuration — origins differ
/// on whether they serve under `/hls` themselves.
///
/// Pure function of its inputs and static configuration.
pub fn upstream_url(
    config: &Config,
    path: &str,
    query: Option<&str>,
) -> Result<Url, ProxyError> {
    let mut target = String::from(config.origin_base());
    if !config.strip_mount_prefix {
        target.push_str(MOUNT_POINT);
    }
    target.push('/');
    target.push_str(path.trim_start_matches('/'));
    if let Some(q) = query {
        if !q.is_empty() {
            target.push('?');
            target.push_str(q);
        }
    }

    Url::parse(&target)
        .map_err(|e| ProxyError::InvalidTarget(format!("{target}: {e}")))
}
