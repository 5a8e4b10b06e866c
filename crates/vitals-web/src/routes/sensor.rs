//! Device push and snapshot routes.
//!
//! Endpoints:
//! - `POST /sensor-data` - accept one reading from an HTTP-capable device
//! - `GET /api/vitals` - current-value snapshot
//! - `GET /api/vitals/:channel/history` - recent samples for one channel

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::json;

use vitals_core::{normalize, Metric};
use vitals_ingest::parse_push;

use crate::AppState;

/// Create sensor data routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sensor-data", post(push_sensor_data))
        .route("/api/vitals", get(get_snapshot))
        .route("/api/vitals/:channel/history", get(get_history))
}

/// POST /sensor-data
///
/// Accepts a JSON object with any subset of the vitals fields, applies it
/// to the live state, and returns the updated snapshot.
async fn push_sensor_data(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> impl IntoResponse {
    let candidate = match parse_push(&payload) {
        Ok(candidate) => candidate,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected sensor-data push");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            );
        }
    };

    state.broadcaster.ingest(normalize(candidate)).await;
    let snapshot = state.broadcaster.snapshot().await;
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "snapshot": snapshot })),
    )
}

/// GET /api/vitals
async fn get_snapshot(State(state): State<AppState>) -> Json<vitals_core::SensorState> {
    Json(state.broadcaster.snapshot().await)
}

/// GET /api/vitals/:channel/history
async fn get_history(
    State(state): State<AppState>,
    Path(channel): Path<String>,
) -> impl IntoResponse {
    let Some(metric) = Metric::from_channel(&channel) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("unknown channel: {channel}") })),
        );
    };

    let samples = state.broadcaster.history(metric).await;
    (
        StatusCode::OK,
        Json(json!({ "channel": channel, "samples": samples })),
    )
}
