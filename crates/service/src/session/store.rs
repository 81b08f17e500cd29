use std::sync::Arc;

use chrono::Duration;
use configs::{SessionConfig, WriteFailurePolicy};
use tracing::{debug, info, instrument, warn};

use super::clock::SharedClock;
use super::domain::{GuestSession, SweepReport, UserSession};
use super::errors::SessionError;
use super::repository::SessionRepository;
use crate::auth::domain::AuthUser;
use crate::guest::domain::GuestProfile;

/// Lifetime and failure policy applied by [`SessionStore`].
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub user_ttl: Duration,
    pub write_failure: WriteFailurePolicy,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self { user_ttl: Duration::days(60), write_failure: WriteFailurePolicy::FailOpen }
    }
}

impl From<&SessionConfig> for SessionPolicy {
    fn from(cfg: &SessionConfig) -> Self {
        Self { user_ttl: Duration::days(cfg.user_ttl_days), write_failure: cfg.write_failure_policy }
    }
}

/// Creates, validates and destroys user and guest sessions.
///
/// Validation always asks storage and filters on `expires > now`, so a row the
/// sweeper has not reached yet is already invalid. A failed row write during
/// create is governed by [`SessionPolicy::write_failure`]: with `FailOpen` the
/// freshly minted token is still returned, although no later validation will
/// find it.
pub struct SessionStore {
    repo: Arc<dyn SessionRepository>,
    clock: SharedClock,
    policy: SessionPolicy,
}

impl SessionStore {
    pub fn new(repo: Arc<dyn SessionRepository>, clock: SharedClock, policy: SessionPolicy) -> Self {
        Self { repo, clock, policy }
    }

    /// Mint a new session for a registered user; never reuses tokens.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::session::{SessionStore, SessionPolicy, clock, repository::mock::MockSessionRepository};
    /// use service::auth::domain::AuthUser;
    /// let store = SessionStore::new(Arc::new(MockSessionRepository::default()), clock::system_clock(), SessionPolicy::default());
    /// let user = AuthUser { id: uuid::Uuid::new_v4(), phone: "5550100".into(), first_name: "Ada".into(), email: None, verified: true };
    /// let token = tokio_test::block_on(store.create_user_session(&user)).unwrap();
    /// let session = tokio_test::block_on(store.validate_user(&token)).unwrap().unwrap();
    /// assert_eq!(session.user.id, user.id);
    /// ```
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn create_user_session(&self, user: &AuthUser) -> Result<String, SessionError> {
        let token = common::utils::token::session_token();
        let expires = self.clock.utc() + self.policy.user_ttl;
        let written = self.repo.insert_user_session(&token, user, expires).await;
        self.settle_write(written, "user")?;
        info!(user_id = %user.id, %expires, "user_session_created");
        Ok(token)
    }

    /// Return the guest's live session token if one exists, else mint one
    /// expiring after `ttl`.
    ///
    /// The lookup and insert are not atomic: two concurrent logins for the same
    /// guest can each mint a token. Both rows stay valid until they expire.
    #[instrument(skip(self, guest), fields(guest_id = %guest.id))]
    pub async fn create_guest_session(&self, guest: &GuestProfile, ttl: Duration) -> Result<String, SessionError> {
        let now = self.clock.utc();
        if let Some(existing) = self.repo.find_live_guest_token(guest.id, now).await? {
            debug!(guest_id = %guest.id, "guest_session_reused");
            return Ok(existing);
        }
        let token = common::utils::token::session_token();
        let expires = now + ttl;
        let written = self.repo.insert_guest_session(&token, guest, expires).await;
        self.settle_write(written, "guest")?;
        info!(guest_id = %guest.id, %expires, "guest_session_created");
        Ok(token)
    }

    fn settle_write(&self, written: Result<(), SessionError>, kind: &'static str) -> Result<(), SessionError> {
        match (written, self.policy.write_failure) {
            (Ok(()), _) => Ok(()),
            (Err(e), WriteFailurePolicy::FailOpen) => {
                warn!(kind, error = %e, "session row not persisted; token handed out anyway");
                Ok(())
            }
            (Err(e), WriteFailurePolicy::FailClosed) => Err(e),
        }
    }

    /// `Ok(None)` for unknown and expired tokens alike; storage errors propagate.
    pub async fn validate_user(&self, token: &str) -> Result<Option<UserSession>, SessionError> {
        if token.is_empty() {
            return Ok(None);
        }
        self.repo.find_user_session(token, self.clock.utc()).await
    }

    pub async fn validate_guest(&self, token: &str) -> Result<Option<GuestSession>, SessionError> {
        if token.is_empty() {
            return Ok(None);
        }
        self.repo.find_guest_session(token, self.clock.utc()).await
    }

    /// Deleting an absent token is not an error.
    pub async fn destroy_user(&self, token: &str) -> Result<(), SessionError> {
        self.repo.delete_user_session(token).await
    }

    pub async fn destroy_guest(&self, token: &str) -> Result<(), SessionError> {
        self.repo.delete_guest_session(token).await
    }

    /// Delete every row, in both namespaces, that expired before now.
    pub async fn sweep(&self) -> Result<SweepReport, SessionError> {
        let report = self.repo.delete_expired(self.clock.utc()).await?;
        if report.total() > 0 {
            info!(user_rows = report.user_rows, guest_rows = report.guest_rows, "expired_sessions_swept");
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::clock::ManualClock;
    use crate::session::repository::mock::MockSessionRepository;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    struct Fixture {
        repo: Arc<MockSessionRepository>,
        clock: Arc<ManualClock>,
        store: SessionStore,
    }

    fn fixture(write_failure: WriteFailurePolicy) -> Fixture {
        let repo = Arc::new(MockSessionRepository::default());
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()));
        let policy = SessionPolicy { user_ttl: Duration::days(60), write_failure };
        let store = SessionStore::new(repo.clone(), clock.clone(), policy);
        Fixture { repo, clock, store }
    }

    fn user() -> AuthUser {
        AuthUser { id: Uuid::new_v4(), phone: "5550100".into(), first_name: "Ada".into(), email: None, verified: true }
    }

    fn guest() -> GuestProfile {
        GuestProfile { id: Uuid::new_v4(), facebook_id: "fb-1".into(), name: "Grace".into(), email: None }
    }

    #[tokio::test]
    async fn user_sessions_are_never_reused() {
        let f = fixture(WriteFailurePolicy::FailOpen);
        let u = user();
        let a = f.store.create_user_session(&u).await.unwrap();
        let b = f.store.create_user_session(&u).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(f.repo.user_rows(), 2);
    }

    #[tokio::test]
    async fn user_session_expires_after_sixty_days() {
        let f = fixture(WriteFailurePolicy::FailOpen);
        let token = f.store.create_user_session(&user()).await.unwrap();
        f.clock.advance(Duration::days(59));
        assert!(f.store.validate_user(&token).await.unwrap().is_some());
        f.clock.advance(Duration::days(1));
        // expired but not swept: still reported invalid
        assert!(f.store.validate_user(&token).await.unwrap().is_none());
        assert!(f.repo.has_user_row(&token));
    }

    #[tokio::test]
    async fn unknown_and_empty_tokens_are_invalid() {
        let f = fixture(WriteFailurePolicy::FailOpen);
        assert!(f.store.validate_user("nope").await.unwrap().is_none());
        assert!(f.store.validate_user("").await.unwrap().is_none());
        assert!(f.store.validate_guest("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn guest_creation_is_idempotent_while_live() {
        let f = fixture(WriteFailurePolicy::FailOpen);
        let g = guest();
        let a = f.store.create_guest_session(&g, Duration::hours(2)).await.unwrap();
        f.clock.advance(Duration::hours(1));
        let b = f.store.create_guest_session(&g, Duration::hours(2)).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(f.repo.guest_rows(), 1);

        f.clock.advance(Duration::hours(1));
        let c = f.store.create_guest_session(&g, Duration::hours(2)).await.unwrap();
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn guest_namespace_is_separate_from_users() {
        let f = fixture(WriteFailurePolicy::FailOpen);
        let token = f.store.create_guest_session(&guest(), Duration::hours(1)).await.unwrap();
        assert!(f.store.validate_user(&token).await.unwrap().is_none());
        assert!(f.store.validate_guest(&token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn destroy_is_unconditional() {
        let f = fixture(WriteFailurePolicy::FailOpen);
        let token = f.store.create_user_session(&user()).await.unwrap();
        f.store.destroy_user(&token).await.unwrap();
        assert!(f.store.validate_user(&token).await.unwrap().is_none());
        f.store.destroy_user(&token).await.unwrap();
        f.store.destroy_guest("never-existed").await.unwrap();
    }

    #[tokio::test]
    async fn fail_open_returns_token_when_write_fails() {
        let f = fixture(WriteFailurePolicy::FailOpen);
        f.repo.fail_writes(true);
        let token = f.store.create_user_session(&user()).await.unwrap();
        assert!(!token.is_empty());
        assert_eq!(f.repo.user_rows(), 0);
    }

    #[tokio::test]
    async fn fail_closed_propagates_write_failure() {
        let f = fixture(WriteFailurePolicy::FailClosed);
        f.repo.fail_writes(true);
        let err = f.store.create_user_session(&user()).await.unwrap_err();
        assert!(matches!(err, SessionError::Storage { op: "insert_user_session", .. }));
        assert!(f.store.create_guest_session(&guest(), Duration::hours(1)).await.is_err());
    }

    #[tokio::test]
    async fn read_failure_is_an_error_not_invalid() {
        let f = fixture(WriteFailurePolicy::FailOpen);
        let token = f.store.create_user_session(&user()).await.unwrap();
        f.repo.fail_reads(true);
        assert!(f.store.validate_user(&token).await.is_err());
        assert!(f.store.validate_guest(&token).await.is_err());
    }

    #[tokio::test]
    async fn sweep_removes_exactly_expired_rows_in_both_namespaces() {
        let f = fixture(WriteFailurePolicy::FailOpen);
        let short_user = f.store.create_user_session(&user()).await.unwrap();
        let short_guest = f.store.create_guest_session(&guest(), Duration::days(1)).await.unwrap();
        f.clock.advance(Duration::days(30));
        let long_user = f.store.create_user_session(&user()).await.unwrap();
        let long_guest = f.store.create_guest_session(&guest(), Duration::days(90)).await.unwrap();

        f.clock.advance(Duration::days(31));
        let report = f.store.sweep().await.unwrap();
        assert_eq!(report, SweepReport { user_rows: 1, guest_rows: 1 });
        assert!(!f.repo.has_user_row(&short_user));
        assert!(!f.repo.has_guest_row(&short_guest));
        assert!(f.repo.has_user_row(&long_user));
        assert!(f.repo.has_guest_row(&long_guest));

        let again = f.store.sweep().await.unwrap();
        assert_eq!(again.total(), 0);
    }
}
