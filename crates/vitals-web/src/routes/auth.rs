//! Viewer signup and login routes.
//!
//! Endpoints:
//! - `POST /api/auth/signup` - register a new viewer, returns a token
//! - `POST /api/auth/login` - exchange credentials for a token

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::json;

use vitals_core::{AuthError, AuthGate, Credentials};

use crate::AppState;

#[derive(Debug, Deserialize)]
struct SignupRequest {
    name: String,
    email: String,
    password: String,
}

/// Create auth routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
}

/// POST /api/auth/signup
async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> impl IntoResponse {
    match state
        .auth
        .register(&request.name, &request.email, &request.password)
    {
        Ok(session) => (
            StatusCode::CREATED,
            Json(json!({ "token": session.token, "name": session.name })),
        ),
        Err(e) => auth_error_response(e),
    }
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> impl IntoResponse {
    match state.auth.authenticate(&credentials) {
        Ok(session) => (
            StatusCode::OK,
            Json(json!({ "token": session.token, "name": session.name })),
        ),
        Err(e) => auth_error_response(e),
    }
}

fn auth_error_response(error: AuthError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match error {
        AuthError::InvalidCredentials | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
        AuthError::AlreadyRegistered => StatusCode::CONFLICT,
        AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": error.to_string() })))
}
