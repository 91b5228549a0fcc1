//! Manifest Rewriter: remap every URI line of a fetched playlist onto the
//! proxy's own mount point.
//!
//! The transform is strictly line-preserving. Directive and empty lines are
//! emitted byte-identical; URI lines are resolved against the manifest's own
//! upstream location and rebuilt under the proxy's self-origin. A line that
//! fails URI resolution, or that points at a third-party host, passes
//! through unchanged — one odd line must not break the whole playlist, and
//! external references (ad insertion and the like) must survive untouched.

use axum::http::{HeaderMap, header};
use url::Url;

/// Everything a single rewrite pass needs, threaded explicitly per request.
/// Self-origin is request-derived state and must never live in a global.
pub struct RewriteContext<'a> {
    /// Upstream location of the manifest being rewritten; relative URIs
    /// resolve against this.
    pub manifest_url: &'a Url,
    /// Configured origin base. Absolute URIs on this host (the origin's raw
    /// address) are ours to rewrite even when the manifest was fetched via
    /// another hostname.
    pub origin_base: &'a Url,
    /// `scheme://host` the proxy is externally reachable at.
    pub self_origin: &'a str,
    /// Proxy-side mount path, e.g. `/hls`.
    pub mount: &'a str,
}

/// Compute the proxy's externally observed scheme+host for this request.
///
/// Honors `X-Forwarded-Proto`/`X-Forwarded-Host` (deployment behind a load
/// balancer or TLS terminator), then the connection's own `Host` header,
/// then the configured base URL.
pub fn self_origin(headers: &HeaderMap, fallback_base_url: &str) -> String {
    let forwarded_host = headers
        .get("x-forwarded-host")
        .and_then(|v| v.to_str().ok());
    let host = forwarded_host.or_else(|| headers.get(header::HOST).and_then(|v| v.to_str().ok()));

    let Some(host) = host else {
        return fallback_base_url.trim_end_matches('/').to_string();
    };

    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");

    // Multiple proxy hops stack comma-separated values; the first entry is
    // the client-facing one.
    let host = host.split(',').next().unwrap_or(host).trim();
    let proto = proto.split(',').next().unwrap_or(proto).trim();

    format!("{proto}://{host}")
}

/// Rewrite a full manifest body. Line count and order are invariant; the
/// output differs from the input only in URI lines that resolve to the
/// origin.
pub fn rewrite_manifest(body: &str, ctx: &RewriteContext<'_>) -> String {
    body.split('\n')
        .map(|line| rewrite_line(line, ctx))
        .collect::<Vec<_>>()
        .join("\n")
}

fn rewrite_line(raw: &str, ctx: &RewriteContext<'_>) -> String {
    // CRLF playlists: keep the terminator out of URI resolution, put it back
    // on the way out.
    let (line, had_cr) = match raw.strip_suffix('\r') {
        Some(stripped) => (stripped, true),
        None => (raw, false),
    };

    match rewrite_uri(line, ctx) {
        Some(mut rewritten) => {
            if had_cr {
                rewritten.push('\r');
            }
            rewritten
        }
        None => raw.to_string(),
    }
}

/// Rewrite a single candidate URI line. `None` means "emit unchanged".
fn rewrite_uri(line: &str, ctx: &RewriteContext<'_>) -> Option<String> {
    // Directive or blank — not a URI line.
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    // Resolution failure is a local recovery, not an error: pass through.
    let resolved = ctx.manifest_url.join(line).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }

    // Absolute URI on a third-party host: intentionally external, keep it.
    if !points_at_origin(&resolved, ctx) {
        return None;
    }

    let path = resolved.path();
    let marker = format!("{}/", ctx.mount);

    let mut out = String::with_capacity(ctx.self_origin.len() + path.len() + 16);
    out.push_str(ctx.self_origin);
    match path.find(&marker) {
        // Origin already serves under the mount marker: reuse from its
        // first occurrence so the proxy path mirrors the origin layout.
        Some(idx) => out.push_str(&path[idx..]),
        // Origin paths lack the marker (strip-prefix deployments): remount.
        None => {
            out.push_str(ctx.mount);
            if !path.starts_with('/') {
                out.push('/');
            }
            out.push_str(path);
        }
    }

    // Signed-URL tokens and friends ride in the query — never drop it.
    if let Some(query) = resolved.query() {
        out.push('?');
        out.push_str(query);
    }

    Some(out)
}

/// Does this absolute URI point at the origin (by either the manifest's own
/// upstream host or the configured origin's raw address)?
fn points_at_origin(resolved: &Url, ctx: &RewriteContext<'_>) -> bool {
    same_host(resolved, ctx.manifest_url) || same_host(resolved, ctx.origin_base)
}

/// Host-level comparison: hostnames must match; ports must match when both
/// sides specify one explicitly.
fn same_host(a: &Url, b: &Url) -> bool {
    if a.host_str() != b.host_str() {
        return false;
    }
    match (a.port(), b.port()) {
        (Some(x), Some(y)) => x == y,
        _ => true,
    }
}
