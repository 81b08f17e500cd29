use std::sync::Arc;

use chrono::Duration;
use configs::SessionConfig;
use tracing::{info, instrument, warn};

use super::domain::{GuestLogin, GuestProfile};
use super::errors::GuestError;
use super::identity::IdentityProvider;
use super::repository::{GuestRepository, GuestUpsert};
use crate::session::SessionStore;

/// How long guest sessions live relative to the provider's token.
#[derive(Debug, Clone, Copy)]
pub struct GuestConfig {
    /// Subtracted from the long-lived token's lifetime.
    pub ttl_margin: Duration,
    /// Used when the provider reports no lifetime.
    pub default_ttl: Duration,
}

impl Default for GuestConfig {
    fn default() -> Self {
        Self { ttl_margin: Duration::hours(1), default_ttl: Duration::days(60) }
    }
}

impl From<&SessionConfig> for GuestConfig {
    fn from(cfg: &SessionConfig) -> Self {
        Self {
            ttl_margin: Duration::seconds(cfg.guest_ttl_margin_secs),
            default_ttl: Duration::seconds(cfg.guest_default_ttl_secs),
        }
    }
}

/// Upper bound on a provider-reported token lifetime, in seconds.
pub const MAX_PROVIDER_TTL_SECS: i64 = 366 * 86_400;

impl GuestConfig {
    /// Session lifetime for a token the provider says lives `expires_in`
    /// seconds: the margin is taken off unless that leaves nothing. Lifetimes
    /// past [`MAX_PROVIDER_TTL_SECS`] are capped.
    pub fn session_ttl(&self, expires_in: Option<i64>) -> Duration {
        match expires_in {
            Some(secs) if secs > 0 => {
                let full = Duration::seconds(secs.min(MAX_PROVIDER_TTL_SECS));
                let trimmed = full - self.ttl_margin;
                if trimmed > Duration::zero() { trimmed } else { full }
            }
            _ => self.default_ttl,
        }
    }
}

pub struct GuestService {
    identity: Arc<dyn IdentityProvider>,
    repo: Arc<dyn GuestRepository>,
    sessions: Arc<SessionStore>,
    cfg: GuestConfig,
}

impl GuestService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        repo: Arc<dyn GuestRepository>,
        sessions: Arc<SessionStore>,
        cfg: GuestConfig,
    ) -> Self {
        Self { identity, repo, sessions, cfg }
    }

    /// Sign a guest in with a Facebook access token. A token the provider
    /// rejects writes nothing. A guest who already holds a live session gets
    /// that session back.
    #[instrument(skip(self, fb_token))]
    pub async fn login(&self, fb_token: &str) -> Result<GuestLogin, GuestError> {
        let fb_token = fb_token.trim();
        if fb_token.is_empty() {
            return Err(GuestError::InvalidLogin);
        }

        let profile = self.identity.profile(fb_token).await?;
        let exchanged = match self.identity.exchange(fb_token).await {
            Ok(t) => Some(t),
            Err(e @ super::identity::IdentityError::Rejected(_)) => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "token exchange failed; continuing with default ttl");
                None
            }
        };

        let guest = self.repo.upsert(GuestUpsert {
            facebook_id: profile.id,
            name: profile.name,
            email: profile.email.filter(|e| !e.trim().is_empty()),
            long_token: exchanged.as_ref().map(|t| t.access_token.clone()),
        }).await?;

        let ttl = self.cfg.session_ttl(exchanged.and_then(|t| t.expires_in));
        let session = self.sessions.create_guest_session(&guest, ttl).await?;
        info!(guest_id = %guest.id, ttl_secs = ttl.num_seconds(), "guest_logged_in");
        Ok(GuestLogin { guest, session })
    }

    pub async fn logout(&self, session: &str) -> Result<(), GuestError> {
        self.sessions.destroy_guest(session).await?;
        Ok(())
    }

    pub async fn check(&self, session: &str) -> Result<GuestProfile, GuestError> {
        self.sessions
            .validate_guest(session)
            .await?
            .map(|s| s.guest)
            .ok_or(GuestError::InvalidSession)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guest::domain::IdentityProfile;
    use crate::guest::identity::mock::StaticIdentityProvider;
    use crate::guest::repository::mock::MockGuestRepository;
    use crate::session::clock::system_clock;
    use crate::session::repository::mock::MockSessionRepository;
    use crate::session::SessionPolicy;

    fn profile(id: &str) -> IdentityProfile {
        IdentityProfile { id: id.into(), name: "Grace".into(), email: Some("grace@example.com".into()) }
    }

    struct Fixture {
        svc: GuestService,
        identity: Arc<StaticIdentityProvider>,
        repo: Arc<MockGuestRepository>,
        sessions: Arc<MockSessionRepository>,
    }

    fn fixture(identity: StaticIdentityProvider) -> Fixture {
        let identity = Arc::new(identity);
        let repo = Arc::new(MockGuestRepository::default());
        let sessions = Arc::new(MockSessionRepository::default());
        let store = Arc::new(SessionStore::new(sessions.clone(), system_clock(), SessionPolicy::default()));
        let svc = GuestService::new(identity.clone(), repo.clone(), store, GuestConfig::default());
        Fixture { svc, identity, repo, sessions }
    }

    #[test]
    fn ttl_subtracts_margin_with_fallbacks() {
        let cfg = GuestConfig::default();
        assert_eq!(cfg.session_ttl(Some(7200)), Duration::seconds(3600));
        assert_eq!(cfg.session_ttl(Some(1800)), Duration::seconds(1800));
        assert_eq!(cfg.session_ttl(None), Duration::days(60));
        assert_eq!(cfg.session_ttl(Some(0)), Duration::days(60));
    }

    #[test]
    fn absurd_provider_lifetimes_are_capped() {
        let cfg = GuestConfig::default();
        let capped = Duration::seconds(MAX_PROVIDER_TTL_SECS) - Duration::hours(1);
        assert_eq!(cfg.session_ttl(Some(i64::MAX)), capped);
        assert_eq!(cfg.session_ttl(Some(i64::MAX / 1000)), capped);
        assert_eq!(cfg.session_ttl(Some(10 * 366 * 86_400)), capped);
        let now = chrono::Utc::now();
        assert!(now.checked_add_signed(cfg.session_ttl(Some(i64::MAX))).is_some());
    }

    #[tokio::test]
    async fn rejected_token_writes_nothing() {
        let f = fixture(StaticIdentityProvider::default());
        let err = f.svc.login("bogus").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid Facebook Login");
        assert!(err.is_client_error());
        assert_eq!(f.repo.count(), 0);
        assert_eq!(f.sessions.guest_rows(), 0);
    }

    #[tokio::test]
    async fn empty_token_skips_provider() {
        let f = fixture(StaticIdentityProvider::default());
        assert!(matches!(f.svc.login("  ").await, Err(GuestError::InvalidLogin)));
        assert_eq!(f.identity.calls(), 0);
    }

    #[tokio::test]
    async fn repeated_login_reuses_live_session() {
        let f = fixture(StaticIdentityProvider::default().with_token("tok", profile("fb-1")).expires_in(Some(5_184_000)));
        let first = f.svc.login("tok").await.unwrap();
        let second = f.svc.login("tok").await.unwrap();
        assert_eq!(first.session, second.session);
        assert_eq!(first.guest.id, second.guest.id);
        assert_eq!(f.repo.count(), 1);
        assert_eq!(f.sessions.guest_rows(), 1);
        assert_eq!(f.repo.long_token("fb-1").as_deref(), Some("long-tok"));
    }

    #[tokio::test]
    async fn provider_outage_is_server_side() {
        let f = fixture(StaticIdentityProvider::default().with_token("tok", profile("fb-1")));
        f.identity.set_unavailable(true);
        let err = f.svc.login("tok").await.unwrap_err();
        assert!(matches!(err, GuestError::Collaborator(_)));
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn check_and_logout() {
        let f = fixture(StaticIdentityProvider::default().with_token("tok", profile("fb-1")));
        let login = f.svc.login("tok").await.unwrap();
        assert_eq!(f.svc.check(&login.session).await.unwrap().facebook_id, "fb-1");

        f.svc.logout(&login.session).await.unwrap();
        assert!(matches!(f.svc.check(&login.session).await, Err(GuestError::InvalidSession)));
    }
}
