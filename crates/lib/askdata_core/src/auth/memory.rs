//! In-process principal and refresh-token store.
//!
//! Everything lives behind one `RwLock`, so `rotate` is a single critical
//! section: the check, the flip, and the successor insert happen together.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::AuthError;
use super::store::{CredentialStore, PrincipalStore};
use crate::models::auth::{
    AdminProvision, NewRefreshRecord, Principal, PrincipalWithPassword, RefreshRecord,
    RotateOutcome,
};

#[derive(Default)]
struct Inner {
    principals: HashMap<Uuid, PrincipalWithPassword>,
    refresh: HashMap<Uuid, RefreshRecord>,
}

impl Inner {
    fn insert_record(&mut self, record: NewRefreshRecord) -> Result<(), AuthError> {
        if self.refresh.contains_key(&record.jti) {
            return Err(AuthError::Internal(format!(
                "duplicate refresh jti {}",
                record.jti
            )));
        }
        self.refresh.insert(
            record.jti,
            RefreshRecord {
                jti: record.jti,
                subject_id: record.subject_id,
                revoked: false,
                replaced_by: None,
                client: record.client,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }
}

/// Principal and credential store held in memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of refresh records ever issued (revoked ones included).
    pub fn refresh_record_count(&self) -> Result<usize, AuthError> {
        Ok(self.read()?.refresh.len())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, AuthError> {
        self.inner
            .read()
            .map_err(|_| AuthError::StoreUnavailable("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, AuthError> {
        self.inner
            .write()
            .map_err(|_| AuthError::StoreUnavailable("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl PrincipalStore for MemoryStore {
    async fn find_principal_by_email(
        &self,
        email: &str,
    ) -> Result<Option<PrincipalWithPassword>, AuthError> {
        let inner = self.read()?;
        Ok(inner
            .principals
            .values()
            .find(|p| p.principal.email == email)
            .cloned())
    }

    async fn find_principal_by_id(&self, id: &Uuid) -> Result<Option<Principal>, AuthError> {
        let inner = self.read()?;
        Ok(inner.principals.get(id).map(|p| p.principal.clone()))
    }

    async fn create_principal(
        &self,
        email: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<Principal, AuthError> {
        let mut inner = self.write()?;
        if inner.principals.values().any(|p| p.principal.email == email) {
            return Err(AuthError::Validation("Email already registered".into()));
        }
        let principal = Principal {
            id: Uuid::new_v4(),
            email: email.to_string(),
            is_admin,
            created_at: Utc::now(),
        };
        inner.principals.insert(
            principal.id,
            PrincipalWithPassword {
                principal: principal.clone(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(principal)
    }

    async fn upsert_admin(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<AdminProvision, AuthError> {
        let mut inner = self.write()?;
        let admin_id = inner
            .principals
            .values()
            .find(|p| p.principal.is_admin)
            .map(|p| p.principal.id);
        let clash = inner
            .principals
            .values()
            .any(|p| p.principal.email == email && Some(p.principal.id) != admin_id);
        if clash {
            return Err(AuthError::Validation("Email already registered".into()));
        }

        if let Some(id) = admin_id
            && let Some(admin) = inner.principals.get_mut(&id)
        {
            admin.principal.email = email.to_string();
            admin.password_hash = password_hash.to_string();
            return Ok(AdminProvision::Updated(admin.principal.clone()));
        }

        let principal = Principal {
            id: Uuid::new_v4(),
            email: email.to_string(),
            is_admin: true,
            created_at: Utc::now(),
        };
        inner.principals.insert(
            principal.id,
            PrincipalWithPassword {
                principal: principal.clone(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(AdminProvision::Created(principal))
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn record_issuance(&self, record: NewRefreshRecord) -> Result<(), AuthError> {
        let mut inner = self.write()?;
        if !inner.principals.contains_key(&record.subject_id) {
            return Err(AuthError::Internal(format!(
                "unknown principal {}",
                record.subject_id
            )));
        }
        inner.insert_record(record)
    }

    async fn find_by_jti(&self, jti: &Uuid) -> Result<Option<RefreshRecord>, AuthError> {
        let inner = self.read()?;
        Ok(inner.refresh.get(jti).cloned())
    }

    async fn revoke(&self, jti: &Uuid) -> Result<bool, AuthError> {
        let mut inner = self.write()?;
        Ok(match inner.refresh.get_mut(jti) {
            Some(record) if !record.revoked => {
                record.revoked = true;
                true
            }
            _ => false,
        })
    }

    async fn revoke_all_for_subject(&self, subject: &Uuid) -> Result<u64, AuthError> {
        let mut inner = self.write()?;
        let mut changed = 0;
        for record in inner.refresh.values_mut() {
            if record.subject_id == *subject && !record.revoked {
                record.revoked = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn rotate(
        &self,
        jti: &Uuid,
        successor: NewRefreshRecord,
    ) -> Result<RotateOutcome, AuthError> {
        let mut inner = self.write()?;
        let successor_jti = successor.jti;
        match inner.refresh.get(jti) {
            Some(record) if record.is_active() => {}
            _ => return Ok(RotateOutcome::NotActive),
        }
        inner.insert_record(successor)?;
        if let Some(record) = inner.refresh.get_mut(jti) {
            record.revoked = true;
            record.replaced_by = Some(successor_jti);
        }
        Ok(RotateOutcome::Rotated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::ClientInfo;

    async fn store_with_principal() -> (MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let p = store
            .create_principal("a@x.com", "hash", false)
            .await
            .unwrap();
        (store, p.id)
    }

    fn new_record(subject: Uuid) -> NewRefreshRecord {
        NewRefreshRecord {
            jti: Uuid::new_v4(),
            subject_id: subject,
            client: ClientInfo {
                origin: Some("10.0.0.1".into()),
                agent: Some("curl/8".into()),
            },
        }
    }

    #[tokio::test]
    async fn issuance_creates_active_record() {
        let (store, subject) = store_with_principal().await;
        let rec = new_record(subject);
        let jti = rec.jti;
        store.record_issuance(rec).await.unwrap();

        let found = store.find_by_jti(&jti).await.unwrap().unwrap();
        assert!(found.is_active());
        assert_eq!(found.subject_id, subject);
        assert_eq!(found.client.origin.as_deref(), Some("10.0.0.1"));
        assert_eq!(found.replaced_by, None);
    }

    #[tokio::test]
    async fn issuance_for_unknown_principal_fails() {
        let store = MemoryStore::new();
        assert!(store.record_issuance(new_record(Uuid::new_v4())).await.is_err());
        assert_eq!(store.refresh_record_count().unwrap(), 0);
    }

    #[test]
    fn poisoned_lock_reports_store_unavailable() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.inner.write().unwrap();
            panic!("poison the store lock");
        })
        .join();

        assert!(matches!(
            store.refresh_record_count(),
            Err(AuthError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn revoke_is_idempotent() {
        let (store, subject) = store_with_principal().await;
        let rec = new_record(subject);
        let jti = rec.jti;
        store.record_issuance(rec).await.unwrap();

        assert!(store.revoke(&jti).await.unwrap());
        assert!(!store.revoke(&jti).await.unwrap());
        assert!(!store.revoke(&Uuid::new_v4()).await.unwrap());
        assert!(store.find_by_jti(&jti).await.unwrap().unwrap().revoked);
    }

    #[tokio::test]
    async fn revoke_all_only_touches_the_subject() {
        let (store, subject) = store_with_principal().await;
        let other = store
            .create_principal("b@x.com", "hash", false)
            .await
            .unwrap()
            .id;
        for _ in 0..3 {
            store.record_issuance(new_record(subject)).await.unwrap();
        }
        let keep = new_record(other);
        let keep_jti = keep.jti;
        store.record_issuance(keep).await.unwrap();

        assert_eq!(store.revoke_all_for_subject(&subject).await.unwrap(), 3);
        assert_eq!(store.revoke_all_for_subject(&subject).await.unwrap(), 0);
        assert!(store.find_by_jti(&keep_jti).await.unwrap().unwrap().is_active());
    }

    #[tokio::test]
    async fn rotate_links_successor_and_is_single_shot() {
        let (store, subject) = store_with_principal().await;
        let first = new_record(subject);
        let first_jti = first.jti;
        store.record_issuance(first).await.unwrap();

        let second = new_record(subject);
        let second_jti = second.jti;
        assert_eq!(
            store.rotate(&first_jti, second).await.unwrap(),
            RotateOutcome::Rotated
        );
        let old = store.find_by_jti(&first_jti).await.unwrap().unwrap();
        assert!(old.revoked);
        assert_eq!(old.replaced_by, Some(second_jti));
        assert!(store.find_by_jti(&second_jti).await.unwrap().unwrap().is_active());

        let third = new_record(subject);
        let third_jti = third.jti;
        assert_eq!(
            store.rotate(&first_jti, third).await.unwrap(),
            RotateOutcome::NotActive
        );
        assert!(store.find_by_jti(&third_jti).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rotate_unknown_jti_writes_nothing() {
        let (store, subject) = store_with_principal().await;
        assert_eq!(
            store
                .rotate(&Uuid::new_v4(), new_record(subject))
                .await
                .unwrap(),
            RotateOutcome::NotActive
        );
        assert_eq!(store.refresh_record_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let (store, _) = store_with_principal().await;
        assert!(matches!(
            store.create_principal("a@x.com", "h", false).await,
            Err(AuthError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn upsert_admin_creates_then_updates() {
        let store = MemoryStore::new();
        let created = store.upsert_admin("root@x.com", "h1").await.unwrap();
        assert!(matches!(created, AdminProvision::Created(_)));
        assert!(created.principal().is_admin);

        let updated = store.upsert_admin("boss@x.com", "h2").await.unwrap();
        let AdminProvision::Updated(admin) = updated else {
            panic!("expected update");
        };
        assert_eq!(admin.id, created.principal().id);
        assert_eq!(admin.email, "boss@x.com");

        let stored = store
            .find_principal_by_email("boss@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.password_hash, "h2");
        assert!(store
            .find_principal_by_email("root@x.com")
            .await
            .unwrap()
            .is_none());
    }
}
