//! Bearer-token boundary.
//!
//! Token verification is the job of an external identity provider; the
//! service only checks presented tokens against a verifier constructed once
//! at startup and injected into the handlers. The default verifier resolves
//! opaque tokens from the config file. Registration records an identity but
//! never mints tokens.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    ExpiredToken,
    #[error("token revoked")]
    RevokedToken,
}

/// Authenticated principal resolved from a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Verifier over a fixed token set declared in the config file.
///
/// Stands in for the external identity provider: operators hand out opaque
/// tokens out of band and list them under `[auth] tokens`.
pub struct StaticTokenVerifier {
    tokens: HashMap<String, String>,
    revoked: HashSet<String>,
}

impl StaticTokenVerifier {
    pub fn new(tokens: HashMap<String, String>, revoked: HashSet<String>) -> Self {
        Self { tokens, revoked }
    }
}

impl TokenVerifier for StaticTokenVerifier {
    fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        if self.revoked.contains(token) {
            return Err(AuthError::RevokedToken);
        }
        match self.tokens.get(token) {
            Some(username) => Ok(Identity {
                username: username.clone(),
                email: None,
            }),
            None => Err(AuthError::InvalidToken),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// In-process identity registry backing `POST /register`.
pub struct UserDirectory {
    users: Mutex<HashMap<String, Identity>>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    /// Validates and records a new identity. The password is checked for
    /// presence and then discarded; it is never stored or echoed back.
    pub fn register(&self, credentials: &Credentials) -> ApiResult<Identity> {
        let username = credentials.username.trim();
        if username.is_empty() {
            return Err(ApiError::Schema("username must not be empty".to_string()));
        }
        if credentials.password.is_empty() {
            return Err(ApiError::Schema("password must not be empty".to_string()));
        }

        let identity = Identity {
            username: username.to_string(),
            email: credentials
                .email
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(ToOwned::to_owned),
        };

        let mut users = self
            .users
            .lock()
            .map_err(|_| ApiError::Internal("user directory mutex poisoned".to_string()))?;
        if users.contains_key(username) {
            return Err(ApiError::Schema(format!(
                "username '{username}' is already taken"
            )));
        }
        users.insert(username.to_string(), identity.clone());
        Ok(identity)
    }
}

impl Default for UserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn presented_bearer_token(header: Option<&str>) -> Option<&str> {
    header?.strip_prefix("Bearer ").map(str::trim)
}
