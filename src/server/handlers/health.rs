use crate::server::state::AppState;
use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

/// Liveness endpoint, also mounted at `/`.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "origin": state.config.origin_url,
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}
