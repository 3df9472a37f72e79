//! Persistence seams for principals and refresh-token records.
//!
//! `PgStore` implements both traits for production; `MemoryStore` implements
//! them in process with the same atomicity guarantees.

use async_trait::async_trait;
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::{
    AdminProvision, NewRefreshRecord, Principal, PrincipalWithPassword, RefreshRecord,
    RotateOutcome,
};

/// Lookup and provisioning of principals.
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Fetch a principal and its password hash by login handle.
    async fn find_principal_by_email(
        &self,
        email: &str,
    ) -> Result<Option<PrincipalWithPassword>, AuthError>;

    async fn find_principal_by_id(&self, id: &Uuid) -> Result<Option<Principal>, AuthError>;

    /// Create a principal. A duplicate email is a `Validation` error.
    async fn create_principal(
        &self,
        email: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<Principal, AuthError>;

    /// Replace the existing admin's email and password, or create the admin.
    async fn upsert_admin(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<AdminProvision, AuthError>;
}

/// Durable record of refresh-token issuance and revocation.
///
/// No method ever flips `revoked` from `true` back to `false`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert an active record. Must succeed before the token is handed out.
    async fn record_issuance(&self, record: NewRefreshRecord) -> Result<(), AuthError>;

    async fn find_by_jti(&self, jti: &Uuid) -> Result<Option<RefreshRecord>, AuthError>;

    /// Revoke one record. Idempotent; returns whether this call changed it.
    async fn revoke(&self, jti: &Uuid) -> Result<bool, AuthError>;

    /// Revoke every record owned by `subject`. Returns how many changed.
    async fn revoke_all_for_subject(&self, subject: &Uuid) -> Result<u64, AuthError>;

    /// Atomically move `jti` from active to rotated and insert `successor`.
    ///
    /// The flip is a conditional update on `revoked = false`; of two callers
    /// racing on the same `jti`, exactly one gets `Rotated`. On `NotActive`
    /// nothing is written.
    async fn rotate(
        &self,
        jti: &Uuid,
        successor: NewRefreshRecord,
    ) -> Result<RotateOutcome, AuthError>;
}
