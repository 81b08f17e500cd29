use std::time::Duration;

use async_trait::async_trait;
use configs::IdentityConfig;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, warn};

use super::domain::{ExchangedToken, IdentityProfile};

#[derive(Debug, Error)]
pub enum IdentityError {
    /// The provider looked at the token and refused it.
    #[error("token rejected: {0}")]
    Rejected(String),
    #[error("{0}")]
    Unavailable(String),
}

/// Third-party identity lookups used by guest login.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Who owns `access_token`.
    async fn profile(&self, access_token: &str) -> Result<IdentityProfile, IdentityError>;
    /// Trade a short-lived token for a long-lived one.
    async fn exchange(&self, access_token: &str) -> Result<ExchangedToken, IdentityError>;
}

/// Facebook Graph API client.
pub struct FacebookGraph {
    http: reqwest::Client,
    base_url: String,
    app_id: String,
    app_secret: String,
}

impl FacebookGraph {
    pub fn new(cfg: &IdentityConfig) -> Result<Self, IdentityError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;
        Ok(Self {
            http,
            base_url: cfg.graph_url.trim_end_matches('/').to_string(),
            app_id: cfg.app_id.clone(),
            app_secret: cfg.app_secret.clone(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, req: reqwest::RequestBuilder, what: &str) -> Result<T, IdentityError> {
        let resp = req.send().await.map_err(|e| {
            warn!(error = %e, what, "graph request failed");
            IdentityError::Unavailable(e.to_string())
        })?;
        let status = resp.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = resp.text().await.unwrap_or_default();
            debug!(%status, what, "graph rejected token");
            return Err(IdentityError::Rejected(body));
        }
        if !status.is_success() {
            return Err(IdentityError::Unavailable(format!("{what}: graph returned {status}")));
        }
        resp.json::<T>()
            .await
            .map_err(|e| IdentityError::Unavailable(format!("{what}: {e}")))
    }
}

#[async_trait]
impl IdentityProvider for FacebookGraph {
    async fn profile(&self, access_token: &str) -> Result<IdentityProfile, IdentityError> {
        let req = self
            .http
            .get(format!("{}/me", self.base_url))
            .query(&[("fields", "id,name,email")])
            .bearer_auth(access_token);
        self.get_json(req, "profile").await
    }

    async fn exchange(&self, access_token: &str) -> Result<ExchangedToken, IdentityError> {
        let req = self.http.get(format!("{}/oauth/access_token", self.base_url)).query(&[
            ("grant_type", "fb_exchange_token"),
            ("client_id", self.app_id.as_str()),
            ("client_secret", self.app_secret.as_str()),
            ("fb_exchange_token", access_token),
        ]);
        self.get_json(req, "exchange").await
    }
}

pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Accepts a fixed set of tokens, each mapped to a profile.
    #[derive(Default)]
    pub struct StaticIdentityProvider {
        profiles: Mutex<HashMap<String, IdentityProfile>>,
        expires_in: Mutex<Option<i64>>,
        unavailable: AtomicBool,
        calls: AtomicUsize,
    }

    impl StaticIdentityProvider {
        pub fn with_token(self, token: &str, profile: IdentityProfile) -> Self {
            self.profiles.lock().unwrap().insert(token.to_string(), profile);
            self
        }

        pub fn expires_in(self, secs: Option<i64>) -> Self {
            *self.expires_in.lock().unwrap() = secs;
            self
        }

        pub fn set_unavailable(&self, on: bool) {
            self.unavailable.store(on, Ordering::SeqCst);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn lookup(&self, token: &str) -> Result<IdentityProfile, IdentityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(IdentityError::Unavailable("connection refused".into()));
            }
            self.profiles
                .lock()
                .unwrap()
                .get(token)
                .cloned()
                .ok_or_else(|| IdentityError::Rejected("unknown token".into()))
        }
    }

    #[async_trait]
    impl IdentityProvider for StaticIdentityProvider {
        async fn profile(&self, access_token: &str) -> Result<IdentityProfile, IdentityError> {
            self.lookup(access_token)
        }

        async fn exchange(&self, access_token: &str) -> Result<ExchangedToken, IdentityError> {
            self.lookup(access_token)?;
            Ok(ExchangedToken {
                access_token: format!("long-{access_token}"),
                expires_in: *self.expires_in.lock().unwrap(),
            })
        }
    }
}
