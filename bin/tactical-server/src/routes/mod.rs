//! Axum router construction.
//!
//! [`build`] assembles the complete application router:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - The single-page dashboard at `/`
//! - Health / heartbeat route
//! - `/v1` catalog, session and chat routes
//! - OpenAPI document at `/api-docs/openapi.json`

pub mod doc;
mod health;
mod ui;
mod v1;

use axum::extract::DefaultBodyLimit;
use axum::{Router, middleware};
use std::sync::Arc;

use crate::middleware::{cors, trace};
use crate::state::AppState;

/// Largest accepted request body; bounds image uploads.
pub const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(ui::router())
        .merge(health::router())
        .merge(doc::router())
        .nest("/v1", v1::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        // Outermost layers execute first on the way in.
        .layer(cors::cors_layer(state.clone()))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
