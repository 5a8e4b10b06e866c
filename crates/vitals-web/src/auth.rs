//! JWT-backed implementation of the viewer auth gate.
//!
//! Users live in an in-memory directory keyed by email. Passwords are
//! stored as salted SHA-256 digests; tokens are HS256 JWTs valid for one
//! hour. The same gate serves the REST signup/login routes and the
//! WebSocket `token` query parameter check.

use std::collections::HashMap;
use std::sync::RwLock;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use vitals_core::{AuthError, AuthGate, Credentials, Identity, SessionToken};

/// Token lifetime in seconds.
const TOKEN_TTL_SECS: u64 = 3600;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    name: String,
    exp: usize,
}

struct UserRecord {
    name: String,
    salt: String,
    password_hash: String,
}

/// In-memory user directory with JWT token issuance.
pub struct JwtAuthGate {
    secret: String,
    users: RwLock<HashMap<String, UserRecord>>,
}

impl JwtAuthGate {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            users: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new user and issue an initial session token.
    pub fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<SessionToken, AuthError> {
        let mut users = self
            .users
            .write()
            .map_err(|_| AuthError::Internal("user directory poisoned".to_string()))?;
        if users.contains_key(email) {
            return Err(AuthError::AlreadyRegistered);
        }

        let salt = Uuid::new_v4().to_string();
        users.insert(
            email.to_string(),
            UserRecord {
                name: name.to_string(),
                salt: salt.clone(),
                password_hash: hash_password(&salt, password),
            },
        );
        drop(users);

        self.issue_token(email, name)
    }

    fn issue_token(&self, email: &str, name: &str) -> Result<SessionToken, AuthError> {
        let exp = chrono::Utc::now().timestamp() as usize + TOKEN_TTL_SECS as usize;
        let claims = Claims {
            sub: email.to_string(),
            name: name.to_string(),
            exp,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(e.to_string()))?;
        Ok(SessionToken {
            token,
            name: name.to_string(),
        })
    }
}

impl AuthGate for JwtAuthGate {
    fn authenticate(&self, credentials: &Credentials) -> Result<SessionToken, AuthError> {
        let users = self
            .users
            .read()
            .map_err(|_| AuthError::Internal("user directory poisoned".to_string()))?;
        let record = users
            .get(&credentials.email)
            .ok_or(AuthError::InvalidCredentials)?;

        if hash_password(&record.salt, &credentials.password) != record.password_hash {
            return Err(AuthError::InvalidCredentials);
        }
        let name = record.name.clone();
        drop(users);

        self.issue_token(&credentials.email, &name)
    }

    fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|_| AuthError::InvalidToken)?;
        Ok(Identity {
            subject: data.claims.sub,
        })
    }
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
