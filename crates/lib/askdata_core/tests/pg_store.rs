//! `PgStore` against a live database.
//!
//! Run with: `DATABASE_URL=postgres://... cargo test -p askdata_core -- --ignored`

use askdata_core::auth::AuthError;
use askdata_core::auth::postgres::PgStore;
use askdata_core::auth::store::{CredentialStore, PrincipalStore};
use askdata_core::models::auth::{ClientInfo, NewRefreshRecord, RotateOutcome};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

async fn store() -> PgStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("connect");
    askdata_core::migrate::migrate(&pool).await.expect("migrate");
    PgStore::new(pool)
}

/// A fresh principal per test so runs never collide.
async fn principal(store: &PgStore) -> Uuid {
    let email = format!("{}@test.askdata", Uuid::new_v4());
    store
        .create_principal(&email, "hash", false)
        .await
        .unwrap()
        .id
}

fn new_record(subject: Uuid) -> NewRefreshRecord {
    NewRefreshRecord {
        jti: Uuid::new_v4(),
        subject_id: subject,
        client: ClientInfo {
            origin: Some("10.0.0.1".into()),
            agent: Some("pg-test".into()),
        },
    }
}

async fn issued(store: &PgStore, subject: Uuid) -> Uuid {
    let record = new_record(subject);
    let jti = record.jti;
    store.record_issuance(record).await.unwrap();
    jti
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_rotation_has_exactly_one_winner() {
    let store = store().await;
    let subject = principal(&store).await;
    let r0 = issued(&store, subject).await;

    let first = new_record(subject);
    let second = new_record(subject);
    let (first_jti, second_jti) = (first.jti, second.jti);

    let a = tokio::spawn({
        let store = store.clone();
        async move { store.rotate(&r0, first).await }
    });
    let b = tokio::spawn({
        let store = store.clone();
        async move { store.rotate(&r0, second).await }
    });
    let outcomes = [a.await.unwrap().unwrap(), b.await.unwrap().unwrap()];

    let winners = outcomes
        .iter()
        .filter(|o| **o == RotateOutcome::Rotated)
        .count();
    assert_eq!(winners, 1, "{outcomes:?}");
    assert!(outcomes.contains(&RotateOutcome::NotActive));

    let (winner, loser) = if outcomes[0] == RotateOutcome::Rotated {
        (first_jti, second_jti)
    } else {
        (second_jti, first_jti)
    };
    let old = store.find_by_jti(&r0).await.unwrap().unwrap();
    assert!(old.revoked);
    assert_eq!(old.replaced_by, Some(winner));
    assert!(store.find_by_jti(&winner).await.unwrap().unwrap().is_active());
    // The losing transaction's successor was rolled back.
    assert!(store.find_by_jti(&loser).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn rotating_a_revoked_record_is_not_active() {
    let store = store().await;
    let subject = principal(&store).await;
    let r0 = issued(&store, subject).await;
    assert!(store.revoke(&r0).await.unwrap());

    let successor = new_record(subject);
    let successor_jti = successor.jti;
    assert_eq!(
        store.rotate(&r0, successor).await.unwrap(),
        RotateOutcome::NotActive
    );
    assert!(store.find_by_jti(&successor_jti).await.unwrap().is_none());
    assert_eq!(store.find_by_jti(&r0).await.unwrap().unwrap().replaced_by, None);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn revoke_all_counts_only_active_records() {
    let store = store().await;
    let subject = principal(&store).await;
    let bystander = principal(&store).await;
    let a = issued(&store, subject).await;
    issued(&store, subject).await;
    let other = issued(&store, bystander).await;
    store.revoke(&a).await.unwrap();

    assert_eq!(store.revoke_all_for_subject(&subject).await.unwrap(), 1);
    assert_eq!(store.revoke_all_for_subject(&subject).await.unwrap(), 0);
    assert!(store.find_by_jti(&other).await.unwrap().unwrap().is_active());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn revoked_records_cannot_be_reinstated() {
    let store = store().await;
    let subject = principal(&store).await;
    let jti = issued(&store, subject).await;
    store.revoke(&jti).await.unwrap();

    let result = sqlx::query("UPDATE refresh_tokens SET revoked = FALSE WHERE jti = $1")
        .bind(jti)
        .execute(store.pool())
        .await;
    assert!(result.is_err());
    assert!(store.find_by_jti(&jti).await.unwrap().unwrap().revoked);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_email_is_a_validation_error() {
    let store = store().await;
    let email = format!("{}@test.askdata", Uuid::new_v4());
    store.create_principal(&email, "hash", false).await.unwrap();

    let err = store
        .create_principal(&email, "hash", true)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));
}
