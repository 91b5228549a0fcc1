pub mod handlers;
pub mod state;

use crate::config::Config;
use axum::http::{Method, header};
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use state::AppState;
use std::sync::OnceLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Global Prometheus recorder. Installed once; `build_router` is called per
/// test as well, and the recorder cannot be registered twice.
fn metrics_handle() -> PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    HANDLE
        .get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .expect("Failed to install Prometheus recorder")
        })
        .clone()
}

/// Build the Axum router with all routes and the CORS layer.
///
/// Every response — proxied media, errors, preflight — passes through the
/// CORS layer so browser players can always read the status and the
/// `Content-Length`/`Content-Range` headers they need for seeking.
pub async fn build_router(config: Config) -> Router {
    let state = AppState::new(config);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([header::RANGE, header::ACCEPT, header::CONTENT_TYPE])
        .expose_headers([
            header::CONTENT_LENGTH,
            header::CONTENT_RANGE,
            header::ACCEPT_RANGES,
        ]);

    let prometheus = metrics_handle();

    Router::new()
        .route("/", get(handlers::health::health_check))
        .route("/healthz", get(handlers::health::health_check))
        .route("/player", get(handlers::demo::player_page))
        // OPTIONS under the mount point never reaches the handler: the CORS
        // layer answers preflight (and any other OPTIONS) itself.
        .route("/hls/{*path}", get(handlers::media::proxy_media))
        .route(
            "/metrics",
            get(move || {
                let handle = prometheus.clone();
                async move { handle.render() }
            }),
        )
        .layer(cors)
        .with_state(state)
}

/// Start the Axum HTTP server
pub async fn start(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("0.0.0.0:{}", config.port);
    let origin = config.origin_url.clone();

    let app = build_router(config).await;

    let listener = match tokio::net::TcpListener::bind(addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    info!("Proxy listening on http://{} → {}", addr, origin);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
