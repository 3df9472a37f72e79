//! PostgreSQL-backed principal and refresh-token store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::AuthError;
use super::store::{CredentialStore, PrincipalStore};
use crate::models::auth::{
    AdminProvision, ClientInfo, NewRefreshRecord, Principal, PrincipalWithPassword,
    RefreshRecord, RotateOutcome,
};

type PrincipalRow = (Uuid, String, bool, DateTime<Utc>);

type RefreshRow = (
    Uuid,
    Uuid,
    bool,
    Option<Uuid>,
    Option<String>,
    Option<String>,
    DateTime<Utc>,
);

fn principal_from_row((id, email, is_admin, created_at): PrincipalRow) -> Principal {
    Principal {
        id,
        email,
        is_admin,
        created_at,
    }
}

fn refresh_from_row(
    (jti, subject_id, revoked, replaced_by, origin, agent, created_at): RefreshRow,
) -> RefreshRecord {
    RefreshRecord {
        jti,
        subject_id,
        revoked,
        replaced_by,
        client: ClientInfo { origin, agent },
        created_at,
    }
}

/// Map a unique violation on `users.email` to a validation error.
fn email_conflict(e: sqlx::Error) -> AuthError {
    let unique = e
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if unique {
        AuthError::Validation("Email already registered".into())
    } else {
        AuthError::from(e)
    }
}

/// Store over a shared `PgPool`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PrincipalStore for PgStore {
    async fn find_principal_by_email(
        &self,
        email: &str,
    ) -> Result<Option<PrincipalWithPassword>, AuthError> {
        let row = sqlx::query_as::<_, (Uuid, String, bool, DateTime<Utc>, String)>(
            "SELECT id, email, is_admin, created_at, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(
            |(id, email, is_admin, created_at, password_hash)| PrincipalWithPassword {
                principal: principal_from_row((id, email, is_admin, created_at)),
                password_hash,
            },
        ))
    }

    async fn find_principal_by_id(&self, id: &Uuid) -> Result<Option<Principal>, AuthError> {
        let row = sqlx::query_as::<_, PrincipalRow>(
            "SELECT id, email, is_admin, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(principal_from_row))
    }

    async fn create_principal(
        &self,
        email: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<Principal, AuthError> {
        let row = sqlx::query_as::<_, PrincipalRow>(
            "INSERT INTO users (email, password_hash, is_admin) VALUES ($1, $2, $3) \
             RETURNING id, email, is_admin, created_at",
        )
        .bind(email)
        .bind(password_hash)
        .bind(is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(email_conflict)?;
        Ok(principal_from_row(row))
    }

    async fn upsert_admin(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<AdminProvision, AuthError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM users WHERE is_admin ORDER BY created_at LIMIT 1 FOR UPDATE",
        )
        .fetch_optional(&mut *tx)
        .await?;

        let provision = match existing {
            Some(id) => {
                let row = sqlx::query_as::<_, PrincipalRow>(
                    "UPDATE users SET email = $2, password_hash = $3, is_admin = TRUE \
                     WHERE id = $1 RETURNING id, email, is_admin, created_at",
                )
                .bind(id)
                .bind(email)
                .bind(password_hash)
                .fetch_one(&mut *tx)
                .await
                .map_err(email_conflict)?;
                AdminProvision::Updated(principal_from_row(row))
            }
            None => {
                let row = sqlx::query_as::<_, PrincipalRow>(
                    "INSERT INTO users (email, password_hash, is_admin) VALUES ($1, $2, TRUE) \
                     RETURNING id, email, is_admin, created_at",
                )
                .bind(email)
                .bind(password_hash)
                .fetch_one(&mut *tx)
                .await
                .map_err(email_conflict)?;
                AdminProvision::Created(principal_from_row(row))
            }
        };

        tx.commit().await?;
        Ok(provision)
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn record_issuance(&self, record: NewRefreshRecord) -> Result<(), AuthError> {
        sqlx::query(
            "INSERT INTO refresh_tokens (jti, user_id, ip, user_agent) VALUES ($1, $2, $3, $4)",
        )
        .bind(record.jti)
        .bind(record.subject_id)
        .bind(record.client.origin)
        .bind(record.client.agent)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_jti(&self, jti: &Uuid) -> Result<Option<RefreshRecord>, AuthError> {
        let row = sqlx::query_as::<_, RefreshRow>(
            "SELECT jti, user_id, revoked, replaced_by, ip, user_agent, created_at \
             FROM refresh_tokens WHERE jti = $1",
        )
        .bind(jti)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(refresh_from_row))
    }

    async fn revoke(&self, jti: &Uuid) -> Result<bool, AuthError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE WHERE jti = $1 AND revoked = FALSE",
        )
        .bind(jti)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn revoke_all_for_subject(&self, subject: &Uuid) -> Result<u64, AuthError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1 AND revoked = FALSE",
        )
        .bind(subject)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn rotate(
        &self,
        jti: &Uuid,
        successor: NewRefreshRecord,
    ) -> Result<RotateOutcome, AuthError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO refresh_tokens (jti, user_id, ip, user_agent) VALUES ($1, $2, $3, $4)",
        )
        .bind(successor.jti)
        .bind(successor.subject_id)
        .bind(successor.client.origin)
        .bind(successor.client.agent)
        .execute(&mut *tx)
        .await?;

        // Row lock on the presented record serializes concurrent rotations.
        let flipped = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE, replaced_by = $2 \
             WHERE jti = $1 AND revoked = FALSE",
        )
        .bind(jti)
        .bind(successor.jti)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if flipped != 1 {
            tx.rollback().await?;
            return Ok(RotateOutcome::NotActive);
        }

        tx.commit().await?;
        Ok(RotateOutcome::Rotated)
    }
}
