use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::auth::repo::seaorm::to_auth_user;
use crate::guest::repo::seaorm::to_guest_profile;
use crate::session::domain::{GuestSession, SweepReport, UserSession};
use crate::session::errors::SessionError;
use crate::session::repository::SessionRepository;
use crate::auth::domain::AuthUser;
use crate::guest::domain::GuestProfile;
use models::{guest_session, user_session};

pub struct SeaOrmSessionRepository {
    pub db: DatabaseConnection,
}

#[async_trait::async_trait]
impl SessionRepository for SeaOrmSessionRepository {
    async fn insert_user_session(&self, token: &str, user: &AuthUser, expires: DateTime<Utc>) -> Result<(), SessionError> {
        user_session::insert(&self.db, token, user.id, expires)
            .await
            .map_err(|e| SessionError::storage("insert_user_session", e))?;
        Ok(())
    }

    async fn find_user_session(&self, token: &str, now: DateTime<Utc>) -> Result<Option<UserSession>, SessionError> {
        let found = user_session::find_live(&self.db, token, now)
            .await
            .map_err(|e| SessionError::storage("find_user_session", e))?;
        Ok(found.map(|(s, u)| UserSession {
            token: s.token,
            user: to_auth_user(u),
            expires: s.expires.with_timezone(&Utc),
        }))
    }

    async fn delete_user_session(&self, token: &str) -> Result<(), SessionError> {
        user_session::delete(&self.db, token)
            .await
            .map_err(|e| SessionError::storage("delete_user_session", e))?;
        Ok(())
    }

    async fn insert_guest_session(&self, token: &str, guest: &GuestProfile, expires: DateTime<Utc>) -> Result<(), SessionError> {
        guest_session::insert(&self.db, token, guest.id, expires)
            .await
            .map_err(|e| SessionError::storage("insert_guest_session", e))?;
        Ok(())
    }

    async fn find_guest_session(&self, token: &str, now: DateTime<Utc>) -> Result<Option<GuestSession>, SessionError> {
        let found = guest_session::find_live(&self.db, token, now)
            .await
            .map_err(|e| SessionError::storage("find_guest_session", e))?;
        Ok(found.map(|(s, g)| GuestSession {
            token: s.token,
            guest: to_guest_profile(g),
            expires: s.expires.with_timezone(&Utc),
        }))
    }

    async fn find_live_guest_token(&self, guest_id: Uuid, now: DateTime<Utc>) -> Result<Option<String>, SessionError> {
        let found = guest_session::find_live_by_guest(&self.db, guest_id, now)
            .await
            .map_err(|e| SessionError::storage("find_live_guest_token", e))?;
        Ok(found.map(|s| s.token))
    }

    async fn delete_guest_session(&self, token: &str) -> Result<(), SessionError> {
        guest_session::delete(&self.db, token)
            .await
            .map_err(|e| SessionError::storage("delete_guest_session", e))?;
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<SweepReport, SessionError> {
        let user_rows = user_session::delete_expired(&self.db, now)
            .await
            .map_err(|e| SessionError::storage("delete_expired_user_sessions", e))?;
        let guest_rows = guest_session::delete_expired(&self.db, now)
            .await
            .map_err(|e| SessionError::storage("delete_expired_guest_sessions", e))?;
        Ok(SweepReport { user_rows, guest_rows })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;
    use crate::auth::domain::NewUserRecord;
    use crate::auth::repo::seaorm::SeaOrmAuthRepository;
    use crate::auth::repository::AuthRepository;
    use crate::session::clock::ManualClock;
    use crate::session::{SessionPolicy, SessionStore};
    use crate::test_support::get_db;

    fn unique_phone() -> String {
        let n = Uuid::new_v4().as_u128() % 10_000_000_000;
        format!("+1{n:010}")
    }

    #[tokio::test]
    async fn user_session_lifecycle_against_postgres() -> anyhow::Result<()> {
        let Some(db) = get_db().await? else { return Ok(()) };
        let auth = SeaOrmAuthRepository { db: db.clone() };
        let user = auth.create_user(NewUserRecord {
            phone: unique_phone(),
            first_name: "Ada".into(),
            email: None,
            password_hash: "$argon2id$fake".into(),
            password_salt: "salt".into(),
            verification_code: "123456".into(),
        }).await?;

        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = SessionStore::new(
            Arc::new(SeaOrmSessionRepository { db: db.clone() }),
            clock.clone(),
            SessionPolicy::default(),
        );

        let token = store.create_user_session(&user).await?;
        let found = store.validate_user(&token).await?.expect("live session");
        assert_eq!(found.user.id, user.id);

        // expired but not yet swept: already invalid
        clock.advance(Duration::days(60) + Duration::seconds(1));
        assert!(store.validate_user(&token).await?.is_none());

        let report = store.sweep().await?;
        assert!(report.user_rows >= 1);
        assert!(user_session::find_live(&db, &token, Utc::now() - Duration::days(365)).await?.is_none());

        models::user::hard_delete(&db, user.id).await?;
        Ok(())
    }
}
