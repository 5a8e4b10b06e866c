//! Viewer admission control abstraction.
//!
//! Credential storage and token issuance are external collaborators; the
//! core consumes them as an opaque gate. The viewer-facing transport may
//! require a valid token before accepting a subscribe, but device-side
//! ingestion is never gated.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors an auth gate may report. Surfaced to the offending viewer only.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("email already registered")]
    AlreadyRegistered,
    #[error("auth backend error: {0}")]
    Internal(String),
}

/// Login credentials presented by a viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Token issued on successful authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionToken {
    pub token: String,
    pub name: String,
}

/// Identity recovered from a verified token.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub subject: String,
}

/// Admission control on viewer connections.
pub trait AuthGate: Send + Sync {
    /// Exchange credentials for a session token.
    fn authenticate(&self, credentials: &Credentials) -> Result<SessionToken, AuthError>;

    /// Verify a previously issued token.
    fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}
