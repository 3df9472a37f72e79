//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API response shapes
//! (which use `#[serde(rename_all = "camelCase")]`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user identity that can log in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Principal with its password verifier (for internal auth flows).
#[derive(Debug, Clone)]
pub struct PrincipalWithPassword {
    pub principal: Principal,
    pub password_hash: String,
}

/// Outcome of admin provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminProvision {
    /// No admin existed; a new one was created.
    Created(Principal),
    /// The existing admin's email and password were replaced.
    Updated(Principal),
}

impl AdminProvision {
    pub fn principal(&self) -> &Principal {
        match self {
            AdminProvision::Created(p) | AdminProvision::Updated(p) => p,
        }
    }
}

/// Request metadata captured when a refresh token is issued.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    /// Peer address of the request.
    pub origin: Option<String>,
    /// `User-Agent` header value.
    pub agent: Option<String>,
}

/// Persisted refresh-token record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRecord {
    pub jti: Uuid,
    pub subject_id: Uuid,
    /// Monotonic: once `true`, never `false` again.
    pub revoked: bool,
    /// The record that superseded this one on rotation.
    pub replaced_by: Option<Uuid>,
    pub client: ClientInfo,
    pub created_at: DateTime<Utc>,
}

impl RefreshRecord {
    /// Active is the only non-terminal state.
    pub fn is_active(&self) -> bool {
        !self.revoked
    }
}

/// A refresh record about to be written.
#[derive(Debug, Clone)]
pub struct NewRefreshRecord {
    pub jti: Uuid,
    pub subject_id: Uuid,
    pub client: ClientInfo,
}

/// Result of the conditional active → rotated transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateOutcome {
    /// The presented record was active; it is now revoked and the successor exists.
    Rotated,
    /// The presented record was missing or already revoked. Nothing was written.
    NotActive,
}

/// Credential type tag carried in the `type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims shared by access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: principal ID.
    pub sub: String,
    /// Unique token ID; the persistence key for refresh tokens.
    pub jti: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// A freshly minted access/refresh pair.
#[derive(Debug, Clone)]
pub struct IssuedCredentials {
    pub subject_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub access_expires_in: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_expires_in: i64,
}
