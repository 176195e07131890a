//! Health / heartbeat endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::limits::format_bytes;
use crate::state::AppState;

/// Register health-check routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Heartbeat endpoint.
///
/// Returns `{"status": "ok", "version": "...", ...}` with HTTP 200, along
/// with the effective upload limit so operators can check the deployed
/// configuration.
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status":  "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "upload_limit": state.upload_limit,
        "upload_limit_human": format_bytes(state.upload_limit),
    }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
