//! Handler-level tests using tower::ServiceExt::oneshot.
//!
//! Tests the full Axum router (CORS layer + handlers) without binding a TCP
//! listener. Upstream traffic goes to a wiremock origin.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use hlsgate::config::Config;
use hlsgate::server::build_router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Build a test config pointed at the given origin.
///
/// `strip_mount_prefix` is on: the wiremock origin serves plain paths
/// without an `/hls` prefix.
fn test_config(origin: &str) -> Config {
    Config {
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        origin_url: origin.to_string(),
        is_dev: true,
        strip_mount_prefix: true,
        insecure_tls: false,
        upstream_timeout_secs: 5,
        retry_attempts: 2,
        retry_backoff_ms: 1,
        fallback_user_agent: "Mozilla/5.0".to_string(),
    }
}

// ── Health endpoint ─────────────────────────────────────────────────────────

#[tokio::test]
async fn health_returns_200_with_json() {
    let app = build_router(test_config("http://origin.invalid")).await;

    let req = Request::builder()
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert!(json["uptime_seconds"].is_number());
}

#[tokio::test]
async fn root_path_returns_health() {
    let app = build_router(test_config("http://origin.invalid")).await;

    let req = Request::builder().uri("/").body(Body::empty()).unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
}

// ── 404 for unknown routes ──────────────────────────────────────────────────

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = build_router(test_config("http://origin.invalid")).await;

    let req = Request::builder()
        .uri("/nonexistent")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ── Demo player ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn player_page_embeds_requested_stream() {
    let app = build_router(test_config("http://origin.invalid")).await;

    let req = Request::builder()
        .uri("/player?src=/hls/live2/playlist.m3u8")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8_lossy(&body);
    assert!(html.contains("hls.js"));
    assert!(html.contains("/hls/live2/playlist.m3u8"));
}

#[tokio::test]
async fn player_page_rejects_absolute_src() {
    let app = build_router(test_config("http://origin.invalid")).await;

    let req = Request::builder()
        .uri("/player?src=https://evil.example/x.m3u8")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8_lossy(&body);
    assert!(!html.contains("evil.example"));
    assert!(html.contains("/hls/live/playlist.m3u8"));
}

// ── CORS ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn cors_preflight_allows_range() {
    let app = build_router(test_config("http://origin.invalid")).await;

    let req = Request::builder()
        .method("OPTIONS")
        .uri("/hls/live2/playlist.m3u8")
        .header("origin", "https://player.example")
        .header("access-control-request-method", "GET")
        .header("access-control-request-headers", "range")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert!(resp.status().is_success(), "got {}", resp.status());

    let allow_origin = resp
        .headers()
        .get("access-control-allow-origin")
        .expect("missing allow-origin on preflight");
    assert_eq!(allow_origin, "*");

    let allow_headers = resp
        .headers()
        .get("access-control-allow-headers")
        .expect("missing allow-headers on preflight")
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(allow_headers.contains("range"), "got {allow_headers}");
}

#[tokio::test]
async fn options_never_hits_the_origin() {
    // No mock mounted: if OPTIONS were proxied the request would 502.
    let app = build_router(test_config("http://origin.invalid")).await;

    let req = Request::builder()
        .method("OPTIONS")
        .uri("/hls/live2/seg0.ts")
        .header("origin", "https://player.example")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert!(resp.status().is_success(), "got {}", resp.status());
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

// ── Proxied manifest ────────────────────────────────────────────────────────

#[tokio::test]
async fn manifest_is_rewritten_with_manifest_headers() {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/live2/playlist.m3u8"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("#EXTM3U\n#EXT-X-VERSION:3\nseg0.ts\nseg1.ts?x=1\n"),
        )
        .mount(&origin)
        .await;

    let app = build_router(test_config(&origin.uri())).await;

    let req = Request::builder()
        .uri("/hls/live2/playlist.m3u8")
        .header("host", "proxy.test")
        .header("origin", "https://player.example")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let headers = resp.headers().clone();
    assert_eq!(
        headers.get("content-type").unwrap(),
        "application/vnd.apple.mpegurl"
    );
    assert_eq!(headers.get("cache-control").unwrap(), "no-store");
    assert_eq!(headers.get("content-disposition").unwrap(), "inline");
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");

    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8_lossy(&body);
    assert_eq!(
        text,
        "#EXTM3U\n\
         #EXT-X-VERSION:3\n\
         http://proxy.test/hls/live2/seg0.ts\n\
         http://proxy.test/hls/live2/seg1.ts?x=1\n"
    );
}

#[tokio::test]
async fn forwarded_headers_shape_the_rewritten_self_origin() {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/live/playlist.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string("#EXTM3U\nseg.ts\n"))
        .mount(&origin)
        .await;

    let app = build_router(test_config(&origin.uri())).await;

    let req = Request::builder()
        .uri("/hls/live/playlist.m3u8")
        .header("host", "10.0.0.5:3000")
        .header("x-forwarded-proto", "https")
        .header("x-forwarded-host", "cdn.example.com")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8_lossy(&body);
    assert!(
        text.contains("https://cdn.example.com/hls/live/seg.ts"),
        "got:\n{text}"
    );
}

// ── Error paths ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn origin_error_status_passes_through_with_cors() {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/live2/missing.m3u8"))
        .respond_with(
            ResponseTemplate::new(404).set_body_raw("channel not found", "text/html"),
        )
        .expect(1)
        .mount(&origin)
        .await;

    let app = build_router(test_config(&origin.uri())).await;

    let req = Request::builder()
        .uri("/hls/live2/missing.m3u8")
        .header("origin", "https://player.example")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
    // Error bodies keep the origin's own content type, not the HLS one
    assert_eq!(resp.headers().get("content-type").unwrap(), "text/html");

    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"channel not found");
}

#[tokio::test]
async fn transient_origin_failure_becomes_502_after_retry() {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/live2/playlist.m3u8"))
        .respond_with(ResponseTemplate::new(502))
        .expect(2)
        .mount(&origin)
        .await;

    let app = build_router(test_config(&origin.uri())).await;

    let req = Request::builder()
        .uri("/hls/live2/playlist.m3u8")
        .header("origin", "https://player.example")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );

    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8_lossy(&body);
    assert!(
        text.contains("/live2/playlist.m3u8"),
        "diagnostic should name the attempted URL, got: {text}"
    );
}

// ── Metrics exposition ──────────────────────────────────────────────────────

#[tokio::test]
async fn metrics_endpoint_renders_prometheus_text() {
    let app = build_router(test_config("http://origin.invalid")).await;

    let req = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
