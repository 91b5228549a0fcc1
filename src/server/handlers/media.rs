//! The proxy pipeline: resolve → fetch → classify → rewrite or stream.

use crate::{
    config::MOUNT_POINT,
    error::{ProxyError, Result},
    hls::{
        classify::{self, ContentCategory},
        resolve,
        rewrite::{self, RewriteContext},
    },
    http_retry::{RetryConfig, fetch_with_retry, upstream_headers},
    metrics,
};
use axum::{
    body::Body,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, HeaderValue, Method, header},
    response::Response,
};
use futures_util::TryStreamExt;
use std::time::Instant;
use tracing::{info, warn};

use crate::server::state::AppState;

/// Proxy a manifest or segment request to the origin.
///
/// Manifests are buffered (they are kilobytes and the rewrite needs the
/// whole document); everything else is streamed through chunk by chunk so a
/// multi-megabyte segment never sits in proxy memory. If the client
/// disconnects, axum drops the response future and the in-flight reqwest
/// body is aborted with it.
pub async fn proxy_media(
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Response> {
    let start = Instant::now();
    let upstream = resolve::upstream_url(&state.config, &path, query.as_deref())?;

    info!("Proxying {} {} → {}", method, path, upstream);

    let forwarded = upstream_headers(
        &headers,
        state.config.origin_base(),
        &state.config.fallback_user_agent,
    );
    let retry = RetryConfig {
        max_attempts: state.config.retry_attempts,
        backoff: state.config.retry_backoff(),
    };

    let response = match fetch_with_retry(
        &state.http_client,
        method.clone(),
        upstream.as_str(),
        forwarded,
        &retry,
    )
    .await
    {
        Ok(response) => response,
        Err(e) => {
            metrics::record_origin_error();
            metrics::record_request("media", 502);
            metrics::record_duration("media", start);
            return Err(e);
        }
    };

    let status = response.status();
    let upstream_content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let classification = classify::classify(&path, upstream_content_type);
    let category = classification.category;

    let result = if category == ContentCategory::Manifest
        && status.is_success()
        && method != Method::HEAD
    {
        rewrite_and_respond(response, &upstream, &headers, &state, classification).await
    } else {
        stream_response(response, classification)
    };

    metrics::record_request(
        category.as_str(),
        result
            .as_ref()
            .map(|r| r.status().as_u16())
            .unwrap_or(502),
    );
    metrics::record_duration(category.as_str(), start);
    result
}

/// Buffered path: read the whole playlist, remap its URI lines onto this
/// proxy, and emit it with manifest headers.
async fn rewrite_and_respond(
    response: reqwest::Response,
    upstream: &url::Url,
    inbound_headers: &HeaderMap,
    state: &AppState,
    classification: classify::Classification,
) -> Result<Response> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ProxyError::OriginFetch {
            url: upstream.to_string(),
            source: e,
        })?;

    let self_origin = rewrite::self_origin(inbound_headers, &state.config.base_url);
    let ctx = RewriteContext {
        manifest_url: upstream,
        origin_base: &state.origin_base,
        self_origin: &self_origin,
        mount: MOUNT_POINT,
    };
    let body = rewrite::rewrite_manifest(&text, &ctx);

    let mut builder = Response::builder()
        .status(status)
        .header(
            header::CONTENT_TYPE,
            classification.content_type.unwrap_or(classify::HLS_CONTENT_TYPE),
        )
        .header(header::CONTENT_DISPOSITION, "inline")
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .header(header::REFERRER_POLICY, "no-referrer");
    if let Some(cache) = classification.cache_control {
        builder = builder.header(header::CACHE_CONTROL, cache);
    }

    Ok(builder.body(Body::from(body))?)
}

/// Streaming path: relay the upstream body without buffering, preserving
/// status (206 included) and the partial-content header set.
fn stream_response(
    response: reqwest::Response,
    classification: classify::Classification,
) -> Result<Response> {
    let status = response.status();
    let upstream_headers = response.headers().clone();

    let mut builder = Response::builder()
        .status(status)
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .header(header::REFERRER_POLICY, "no-referrer");

    // On origin error statuses the canonical media type would mislabel the
    // error body; pass the upstream's own type through instead.
    let content_type = if status.is_success() {
        classification
            .content_type
            .map(HeaderValue::from_static)
            .or_else(|| upstream_headers.get(header::CONTENT_TYPE).cloned())
            .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"))
    } else {
        upstream_headers
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("text/plain; charset=utf-8"))
    };
    builder = builder.header(header::CONTENT_TYPE, content_type);

    if status.is_success() {
        if let Some(cache) = classification.cache_control {
            builder = builder.header(header::CACHE_CONTROL, cache);
        }
    }

    // Range semantics: forward the partial-content headers verbatim and
    // default Accept-Ranges so players know seeking works.
    for name in [header::CONTENT_LENGTH, header::CONTENT_RANGE] {
        if let Some(value) = upstream_headers.get(&name) {
            builder = builder.header(name, value.clone());
        }
    }
    let accept_ranges = upstream_headers
        .get(header::ACCEPT_RANGES)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("bytes"));
    builder = builder.header(header::ACCEPT_RANGES, accept_ranges);

    // A failure mid-stream ends the body; bytes already sent cannot be
    // un-sent, so there is no retry here. Player-level retry is the
    // expected recovery path.
    let stream = response
        .bytes_stream()
        .inspect_err(|e| warn!("upstream stream failed mid-transfer: {}", e));

    Ok(builder.body(Body::from_stream(stream))?)
}
