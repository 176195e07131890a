//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS header, per-request trace-ID injection)
//! - Health / heartbeat route
//! - The conversion endpoint at `/`

mod convert;
mod health;

use axum::{Router, middleware};
use std::sync::Arc;

use crate::middleware::{cors, trace};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router())
        .merge(convert::router())
        // Outermost layers execute first on the way in.
        .layer(cors::cors_layer())
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}
