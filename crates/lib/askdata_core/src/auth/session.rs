//! Session manager: login, refresh rotation with reuse detection, logout,
//! and access-token authorization.
//!
//! A refresh `jti` is Active until it is either Rotated (superseded by a new
//! `jti`) or Revoked. Presenting a refresh token whose record is missing or
//! no longer active is treated as theft: every session of that principal is
//! revoked.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::AuthError;
use super::config::SessionConfig;
use super::jwt::TokenCodec;
use super::password::{hash_password, verify_password};
use super::store::{CredentialStore, PrincipalStore};
use crate::models::auth::{
    ClientInfo, IssuedCredentials, NewRefreshRecord, Principal, RotateOutcome, TokenClaims,
};

/// Verified against when the login handle is unknown, so both failure paths
/// cost one bcrypt verification.
const DUMMY_PASSWORD: &str = "askdata-dummy-password";

/// Canonical form of a login handle.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Orchestrates credential issuance over a codec and the two stores.
pub struct SessionManager {
    codec: TokenCodec,
    principals: Arc<dyn PrincipalStore>,
    credentials: Arc<dyn CredentialStore>,
    dummy_hash: String,
}

impl SessionManager {
    pub fn new(
        config: &SessionConfig,
        principals: Arc<dyn PrincipalStore>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, AuthError> {
        config
            .validate()
            .map_err(|e| AuthError::Validation(e.to_string()))?;
        Ok(Self {
            codec: TokenCodec::new(config),
            principals,
            credentials,
            dummy_hash: hash_password(DUMMY_PASSWORD)?,
        })
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Authenticate with email + password and open a new session.
    ///
    /// Existing sessions of the principal are left alone.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client: ClientInfo,
    ) -> Result<IssuedCredentials, AuthError> {
        let found = self
            .principals
            .find_principal_by_email(&normalize_email(email))
            .await?;

        let hash = found
            .as_ref()
            .map_or(self.dummy_hash.as_str(), |p| p.password_hash.as_str());
        let matches = verify_password(password, hash).unwrap_or_else(|e| {
            warn!(error = %e, "stored password hash is unusable");
            false
        });

        let principal = match found {
            Some(p) if matches => p.principal,
            _ => return Err(AuthError::InvalidCredentials),
        };

        let issued = self.issue(principal.id, client).await?;
        info!(subject = %principal.id, "login succeeded");
        Ok(issued)
    }

    /// Exchange a refresh token for a new pair, retiring the presented one.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        client: ClientInfo,
    ) -> Result<IssuedCredentials, AuthError> {
        let claims = self.codec.verify_refresh(refresh_token)?;
        let (subject, jti) = claim_ids(&claims).ok_or(AuthError::InvalidCredential)?;

        match self.credentials.find_by_jti(&jti).await? {
            None => return Err(self.respond_to_reuse(&subject, &jti, "unknown jti").await),
            Some(record) if record.revoked => {
                return Err(self.respond_to_reuse(&subject, &jti, "revoked jti").await);
            }
            Some(record) if record.subject_id != subject => {
                warn!(%jti, claimed = %subject, owner = %record.subject_id, "refresh subject mismatch");
                self.credentials.revoke(&jti).await?;
                return Err(AuthError::InvalidCredential);
            }
            Some(_) => {}
        }

        let access_token = self.codec.sign_access(&subject)?;
        let (refresh_token, successor) = self.codec.sign_refresh(&subject)?;
        let outcome = self
            .credentials
            .rotate(
                &jti,
                NewRefreshRecord {
                    jti: successor,
                    subject_id: subject,
                    client,
                },
            )
            .await?;

        match outcome {
            RotateOutcome::Rotated => {
                debug!(%subject, from = %jti, to = %successor, "refresh token rotated");
                Ok(self.pair(subject, access_token, refresh_token))
            }
            // Lost a race against another presentation of the same token.
            RotateOutcome::NotActive => {
                Err(self.respond_to_reuse(&subject, &jti, "concurrent rotation").await)
            }
        }
    }

    /// Revoke every session of the access token's subject.
    ///
    /// A missing, invalid, or expired token is not an error.
    pub async fn logout(&self, access_token: Option<&str>) -> Result<(), AuthError> {
        let subject = access_token
            .and_then(|t| self.codec.verify_access(t).ok())
            .and_then(|claims| Uuid::parse_str(&claims.sub).ok());

        match subject {
            Some(subject) => {
                let revoked = self.credentials.revoke_all_for_subject(&subject).await?;
                info!(%subject, revoked, "logout revoked sessions");
            }
            None => debug!("logout without a valid access token"),
        }
        Ok(())
    }

    /// Resolve a presented access token to its subject.
    pub fn authorize(&self, presented: Option<&str>) -> Result<Uuid, AuthError> {
        let token = presented
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::Unauthorized)?;
        let claims = self
            .codec
            .verify_access(token)
            .map_err(|_| AuthError::Unauthorized)?;
        Uuid::parse_str(&claims.sub).map_err(|_| AuthError::Unauthorized)
    }

    /// Look up the principal behind an authorized subject.
    pub async fn principal(&self, subject: &Uuid) -> Result<Option<Principal>, AuthError> {
        self.principals.find_principal_by_id(subject).await
    }

    /// Mint a pair and persist the refresh record. Nothing is returned unless
    /// the record is stored.
    async fn issue(&self, subject: Uuid, client: ClientInfo) -> Result<IssuedCredentials, AuthError> {
        let access_token = self.codec.sign_access(&subject)?;
        let (refresh_token, jti) = self.codec.sign_refresh(&subject)?;
        self.credentials
            .record_issuance(NewRefreshRecord {
                jti,
                subject_id: subject,
                client,
            })
            .await?;
        Ok(self.pair(subject, access_token, refresh_token))
    }

    fn pair(&self, subject: Uuid, access_token: String, refresh_token: String) -> IssuedCredentials {
        IssuedCredentials {
            subject_id: subject,
            access_token,
            refresh_token,
            access_expires_in: self.codec.access_ttl_secs(),
            refresh_expires_in: self.codec.refresh_ttl_secs(),
        }
    }

    /// Kill every session of `subject` and produce the error to surface.
    async fn respond_to_reuse(&self, subject: &Uuid, jti: &Uuid, reason: &str) -> AuthError {
        match self.credentials.revoke_all_for_subject(subject).await {
            Ok(revoked) => {
                warn!(%subject, %jti, reason, revoked, "refresh token reuse detected; all sessions revoked");
                AuthError::ReuseDetected
            }
            Err(e) => {
                error!(%subject, %jti, error = %e, "reuse detected but revocation failed");
                e
            }
        }
    }
}

fn claim_ids(claims: &TokenClaims) -> Option<(Uuid, Uuid)> {
    let subject = Uuid::parse_str(&claims.sub).ok()?;
    let jti = Uuid::parse_str(&claims.jti).ok()?;
    Some((subject, jti))
}
