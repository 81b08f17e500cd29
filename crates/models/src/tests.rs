//! Database-backed entity tests. They need a reachable Postgres in
//! `DATABASE_URL`; without one (or with `SKIP_DB_TESTS`) they return early.
use anyhow::Result;
use chrono::{Duration, Utc};
use migration::MigratorTrait;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::{db, guest, guest_session, user, user_session};
use crate::errors::ModelError;

async fn setup_test_db() -> Result<Option<DatabaseConnection>> {
    if std::env::var("SKIP_DB_TESTS").is_ok() || std::env::var("DATABASE_URL").is_err() {
        return Ok(None);
    }
    let db = db::connect().await?;
    migration::Migrator::up(&db, None).await?;
    Ok(Some(db))
}

fn random_phone() -> String {
    let n = Uuid::new_v4().as_u128() % 10_000_000_000;
    format!("+1{n:010}")
}

fn new_user(phone: &str) -> user::NewUser {
    user::NewUser {
        phone: phone.to_string(),
        email: Some("cook@example.com".into()),
        first_name: "Cook".into(),
        password_hash: "hash".into(),
        password_salt: "salt".into(),
        verification_code: "123456".into(),
    }
}

#[test]
fn phone_normalization_rules() {
    assert_eq!(user::normalize_phone(" 555-0100 ").unwrap(), "5550100");
    assert!(matches!(user::normalize_phone("555-01a0"), Err(ModelError::Validation(_))));
    assert!(user::normalize_phone("1234567890123456").is_err());
}

#[test]
fn email_and_name_validation() {
    assert!(user::validate_email("a@b.co").is_ok());
    assert!(user::validate_email("nope").is_err());
    assert!(user::validate_email("@b.co").is_err());
    assert!(user::validate_name("  ").is_err());
    assert!(user::validate_name("Ada").is_ok());
}

#[test]
fn credentials_are_not_serialized() {
    let now = Utc::now().into();
    let m = user::Model {
        id: Uuid::new_v4(),
        phone: "5550100".into(),
        email: None,
        first_name: "Ada".into(),
        password_hash: "secret-hash".into(),
        password_salt: "secret-salt".into(),
        password_reset_key: Some("secret-key".into()),
        verification_code: Some("999999".into()),
        verified: true,
        created_at: now,
        updated_at: now,
    };
    let json = serde_json::to_string(&m).unwrap();
    assert!(!json.contains("secret"));
    assert!(!json.contains("999999"));
}

#[tokio::test]
async fn user_lifecycle() -> Result<()> {
    let Some(db) = setup_test_db().await? else { return Ok(()) };
    let phone = random_phone();
    let created = user::create(&db, new_user(&phone)).await?;
    assert!(!created.verified);

    let dup = user::create(&db, new_user(&phone)).await;
    assert!(matches!(dup, Err(ModelError::Conflict(_))));

    let verified = user::mark_verified(&db, created.id).await?;
    assert!(verified.verified);
    assert!(verified.verification_code.is_none());

    user::set_reset_key(&db, created.id, Some("reset".into())).await?;
    user::update_password(&db, created.id, "h2".into(), "s2".into()).await?;
    let found = user::find_by_phone(&db, &phone).await?.expect("user");
    assert_eq!(found.password_hash, "h2");
    assert!(found.password_reset_key.is_none());

    user::hard_delete(&db, created.id).await?;
    Ok(())
}

#[tokio::test]
async fn session_rows_filter_and_sweep_by_expiry() -> Result<()> {
    let Some(db) = setup_test_db().await? else { return Ok(()) };
    let u = user::create(&db, new_user(&random_phone())).await?;
    let g = guest::upsert_from_identity(&db, &Uuid::new_v4().to_string(), "Guest", None, Some("long")).await?;

    let now = Utc::now();
    let live = format!("live-{}", Uuid::new_v4());
    let stale = format!("stale-{}", Uuid::new_v4());
    user_session::insert(&db, &live, u.id, now + Duration::days(1)).await?;
    user_session::insert(&db, &stale, u.id, now - Duration::minutes(1)).await?;
    guest_session::insert(&db, &live, g.id, now + Duration::days(1)).await?;
    guest_session::insert(&db, &stale, g.id, now - Duration::minutes(1)).await?;

    assert!(user_session::find_live(&db, &live, now).await?.is_some());
    assert!(user_session::find_live(&db, &stale, now).await?.is_none());
    assert_eq!(guest_session::find_live_by_guest(&db, g.id, now).await?.map(|s| s.token), Some(live.clone()));

    assert!(user_session::delete_expired(&db, now).await? >= 1);
    assert!(guest_session::delete_expired(&db, now).await? >= 1);
    assert!(user_session::find_live(&db, &live, now).await?.is_some());
    assert!(guest_session::find_live(&db, &live, now).await?.is_some());

    assert_eq!(user_session::delete(&db, &live).await?, 1);
    assert_eq!(user_session::delete(&db, &live).await?, 0);
    guest_session::delete(&db, &live).await?;
    user::hard_delete(&db, u.id).await?;
    Ok(())
}

#[tokio::test]
async fn concurrent_first_logins_share_one_guest() -> Result<()> {
    let Some(db) = setup_test_db().await? else { return Ok(()) };
    let fb = Uuid::new_v4().to_string();

    let (a, b) = tokio::join!(
        guest::upsert_from_identity(&db, &fb, "First", None, Some("tok-a")),
        guest::upsert_from_identity(&db, &fb, "Second", None, Some("tok-b")),
    );
    let (a, b) = (a?, b?);
    assert_eq!(a.id, b.id);

    let stored = guest::find_by_facebook_id(&db, &fb).await?.expect("guest row");
    assert_eq!(stored.id, a.id);
    Ok(())
}
