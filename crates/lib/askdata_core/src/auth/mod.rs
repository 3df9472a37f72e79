//! Authentication and session-credential management.
//!
//! Provides password hashing, the two-secret token codec, the refresh-token
//! store abstraction (Postgres and in-memory), and the session manager that
//! owns rotation and reuse detection. Shared by `askdata_api` and the CLI.

pub mod config;
pub mod jwt;
pub mod memory;
pub mod password;
pub mod postgres;
pub mod session;
pub mod store;

use thiserror::Error;

/// Authentication errors.
///
/// The four credential variants are distinct internally (for logging and
/// tests) and collapse into one generic unauthorized response at the edge.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid credential")]
    InvalidCredential,

    #[error("Refresh token reuse detected")]
    ReuseDetected,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Credential store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// True for every failure that must surface as a generic 401.
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::InvalidCredential
                | AuthError::ReuseDetected
                | AuthError::Unauthorized
        )
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        AuthError::StoreUnavailable(e.to_string())
    }
}
