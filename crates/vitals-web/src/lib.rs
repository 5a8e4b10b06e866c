//! # vitals-web
//!
//! REST API layer for the vitals server.
//!
//! This crate provides:
//! - `POST /sensor-data` push endpoint for HTTP-capable devices
//! - `GET /api/vitals` current snapshot and per-channel history
//! - Signup/login routes issuing JWT session tokens
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vitals_web::{create_router, AppState, JwtAuthGate};
//!
//! let state = AppState::new(broadcaster, Arc::new(JwtAuthGate::new(secret)));
//! let app = create_router(state);
//!
//! let listener = TcpListener::bind("0.0.0.0:3901").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod routes;

// Re-exports
pub use auth::JwtAuthGate;
pub use routes::create_router;

use std::sync::Arc;

use vitals_server::Broadcaster;

/// Shared state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub broadcaster: Arc<Broadcaster>,
    pub auth: Arc<JwtAuthGate>,
}

impl AppState {
    pub fn new(broadcaster: Arc<Broadcaster>, auth: Arc<JwtAuthGate>) -> Self {
        Self { broadcaster, auth }
    }
}
