//! Upstream HTTP fetch with bounded retry.
//!
//! Provides [`fetch_with_retry`], the single fetch path for everything the
//! proxy requests from the origin. Only transport failures and transient
//! gateway statuses (502/504) are retried; any other status is the origin's
//! answer and is returned to the caller untouched, body unread, so the
//! caller decides whether to buffer (manifests) or pipe (segments).

use crate::error::ProxyError;
use crate::metrics;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use std::time::Duration;
use tracing::warn;

/// Default number of fetch attempts (1 initial + 1 retry).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Default backoff between attempts in milliseconds.
pub const DEFAULT_BACKOFF_MS: u64 = 500;

/// Configuration for [`fetch_with_retry`].
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts (minimum 1; 0 is treated as 1).
    pub max_attempts: u32,
    /// Sleep duration between consecutive attempts.
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
        }
    }
}

/// Statuses worth a second attempt: the gateway class that usually means a
/// hiccup between proxy and origin rather than a real origin-side condition.
fn is_transient(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Build the header set forwarded to the origin.
///
/// - `Range` is forwarded verbatim — required for partial playback of
///   segments opened mid-stream.
/// - The client's own `User-Agent` is kept, with a configured fallback for
///   clients that send none.
/// - `Accept-Encoding: identity` keeps manifest bodies uncompressed so they
///   can be line-rewritten without a decode step.
/// - `Referer`/`Origin` present the request as coming from the origin's own
///   site; some origins gate on these.
pub fn upstream_headers(
    inbound: &HeaderMap,
    origin_base: &str,
    fallback_user_agent: &str,
) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if let Some(range) = inbound.get(header::RANGE) {
        headers.insert(header::RANGE, range.clone());
    }

    let user_agent = inbound
        .get(header::USER_AGENT)
        .cloned()
        .or_else(|| HeaderValue::from_str(fallback_user_agent).ok())
        .unwrap_or_else(|| HeaderValue::from_static("Mozilla/5.0"));
    headers.insert(header::USER_AGENT, user_agent);

    headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    if let Ok(referer) = HeaderValue::from_str(&format!("{origin_base}/")) {
        headers.insert(header::REFERER, referer);
    }
    if let Ok(origin) = HeaderValue::from_str(origin_base) {
        headers.insert(header::ORIGIN, origin);
    }

    headers
}

/// Fetch an upstream URL with automatic retry on transient failure.
///
/// Attempts the request up to `config.max_attempts` times, sleeping
/// `config.backoff` between attempts. A response with any non-transient
/// status — success or not — ends the loop immediately and is returned
/// as `Ok`, its body still unread.
///
/// # Errors
///
/// [`ProxyError::OriginFetch`] when the final attempt fails at the
/// transport level, [`ProxyError::UpstreamUnavailable`] when the origin
/// kept answering 502/504 until the budget ran out.
pub async fn fetch_with_retry(
    client: &Client,
    method: Method,
    url: &str,
    headers: HeaderMap,
    config: &RetryConfig,
) -> Result<Response, ProxyError> {
    let max_attempts = config.max_attempts.max(1);
    let mut last_transient = StatusCode::BAD_GATEWAY;

    for attempt in 1..=max_attempts {
        let result = client
            .request(method.clone(), url)
            .headers(headers.clone())
            .send()
            .await;

        match result {
            Ok(response) if is_transient(response.status()) => {
                warn!(
                    "origin returned {} for {} (attempt {}/{})",
                    response.status(),
                    url,
                    attempt,
                    max_attempts
                );
                last_transient = response.status();
            }
            Ok(response) => return Ok(response),
            Err(e) => {
                warn!(
                    "origin fetch failed for {} (attempt {}/{}): {}",
                    url, attempt, max_attempts, e
                );
                if attempt == max_attempts {
                    return Err(ProxyError::OriginFetch {
                        url: url.to_string(),
                        source: e,
                    });
                }
            }
        }

        if attempt < max_attempts {
            metrics::record_retry();
            tokio::time::sleep(config.backoff).await;
        }
    }

    Err(ProxyError::UpstreamUnavailable {
        url: url.to_string(),
        status: last_transient,
        attempts: max_attempts,
    })
}
