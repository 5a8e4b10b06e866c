//! HTTP route handlers for the vitals server.
//!
//! Routes are organized as:
//! - `GET /` - liveness text
//! - `POST /sensor-data` - device push endpoint
//! - `GET /api/vitals` - current snapshot
//! - `GET /api/vitals/:channel/history` - per-channel history
//! - `/api/auth/` - signup and login

pub mod auth;
pub mod sensor;

use axum::{routing::get, Router};

use crate::AppState;

/// Create the main Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(liveness_handler))
        .merge(sensor::routes())
        .nest("/api/auth", auth::routes())
        .with_state(state)
}

/// Handler for `GET /`.
///
/// Plain-text liveness probe for load balancers and uptime monitors.
async fn liveness_handler() -> &'static str {
    "Server is Running..."
}
