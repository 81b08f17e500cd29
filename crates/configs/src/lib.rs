//! Process configuration, loaded once at startup and shared read-only.
//!
//! Values come from a TOML file (`CONFIG_PATH`, default `config.toml`); a few
//! secrets and connection strings fall back to environment variables so they
//! can stay out of the file.

use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How the transport status relates to a failed envelope.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusPolicy {
    /// 200 on success, 500 on any failure; the embedded code is informational.
    #[default]
    Legacy,
    /// Transport status mirrors the envelope's embedded code.
    Mirror,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    #[serde(default = "default_io_timeout")]
    pub read_timeout_secs: u64,
    #[serde(default = "default_io_timeout")]
    pub write_timeout_secs: u64,
    #[serde(default)]
    pub status_policy: StatusPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            worker_threads: Some(4),
            read_timeout_secs: default_io_timeout(),
            write_timeout_secs: default_io_timeout(),
            status_policy: StatusPolicy::Legacy,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

/// What `create` does when the session row cannot be written.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WriteFailurePolicy {
    /// Log the failure and hand the token out anyway.
    #[default]
    FailOpen,
    /// Report the failure to the caller; no token is returned.
    FailClosed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_user_ttl_days")]
    pub user_ttl_days: i64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Subtracted from the identity provider's token lifetime for guest sessions.
    #[serde(default = "default_guest_ttl_margin")]
    pub guest_ttl_margin_secs: i64,
    /// Used when the provider does not report a lifetime.
    #[serde(default = "default_guest_ttl")]
    pub guest_default_ttl_secs: i64,
    #[serde(default)]
    pub write_failure_policy: WriteFailurePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_ttl_days: default_user_ttl_days(),
            sweep_interval_secs: default_sweep_interval(),
            guest_ttl_margin_secs: default_guest_ttl_margin(),
            guest_default_ttl_secs: default_guest_ttl(),
            write_failure_policy: WriteFailurePolicy::FailOpen,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_twilio_base_url")]
    pub twilio_base_url: String,
    #[serde(default)]
    pub twilio_account_sid: String,
    #[serde(default)]
    pub twilio_auth_token: String,
    #[serde(default)]
    pub from_number: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            queue_capacity: default_queue_capacity(),
            twilio_base_url: default_twilio_base_url(),
            twilio_account_sid: String::new(),
            twilio_auth_token: String::new(),
            from_number: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_graph_url")]
    pub graph_url: String,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub app_secret: String,
    #[serde(default = "default_identity_timeout")]
    pub timeout_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            graph_url: default_graph_url(),
            app_id: String::new(),
            app_secret: String::new(),
            timeout_secs: default_identity_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_build_id")]
    pub build_id: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self { build_id: default_build_id(), api_version: default_api_version() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { format: default_log_format() }
    }
}

fn default_io_timeout() -> u64 { 10 }
fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_max_lifetime() -> u64 { 3600 }
fn default_acquire_timeout() -> u64 { 30 }
fn default_user_ttl_days() -> i64 { 60 }
fn default_sweep_interval() -> u64 { 3600 }
fn default_guest_ttl_margin() -> i64 { 3600 }
fn default_guest_ttl() -> i64 { 60 * 60 * 24 * 60 }
fn default_queue_capacity() -> usize { 256 }
fn default_twilio_base_url() -> String { "https://api.twilio.com".into() }
fn default_graph_url() -> String { "https://graph.facebook.com".into() }
fn default_identity_timeout() -> u64 { 10 }
fn default_build_id() -> String { "dev".into() }
fn default_api_version() -> String { "1".into() }
fn default_log_format() -> String { "compact".into() }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Like [`AppConfig::load_and_validate`], but a missing file yields defaults
    /// filled from the environment.
    pub fn load_or_env() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) if is_not_found(&e) => AppConfig::default(),
            Err(e) => return Err(e),
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize_from_env();
        self.server.normalize()?;
        self.database.normalize_from_env();
        self.database.validate()?;
        self.session.validate()?;
        self.notify.normalize_from_env();
        self.notify.validate()?;
        self.identity.normalize_from_env();
        Ok(())
    }
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.downcast_ref::<std::io::Error>()
        .map(|io| io.kind() == std::io::ErrorKind::NotFound)
        .unwrap_or(false)
}

impl ServerConfig {
    fn normalize_from_env(&mut self) {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            if !host.trim().is_empty() { self.host = host; }
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            self.port = port;
        }
    }

    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        if let Some(w) = self.worker_threads {
            if w == 0 { self.worker_threads = Some(4); }
        } else {
            self.worker_threads = Some(4);
        }
        if self.read_timeout_secs == 0 || self.write_timeout_secs == 0 {
            return Err(anyhow!("server read/write timeouts must be positive seconds"));
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn normalize_from_env(&mut self) {
        // TOML 未提供 URL 时回落到环境变量
        if self.url.trim().is_empty() {
            if let Ok(url) = std::env::var("DATABASE_URL") {
                self.url = url;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("database.url is empty; set it in config.toml or DATABASE_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://")) {
            return Err(anyhow!("database.url must start with postgresql:// or postgres://"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive seconds"));
        }
        Ok(())
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.user_ttl_days <= 0 {
            return Err(anyhow!("session.user_ttl_days must be positive"));
        }
        if self.sweep_interval_secs == 0 {
            return Err(anyhow!("session.sweep_interval_secs must be positive"));
        }
        if self.guest_ttl_margin_secs < 0 || self.guest_default_ttl_secs <= 0 {
            return Err(anyhow!("session guest ttl settings must be positive"));
        }
        Ok(())
    }
}

impl NotifyConfig {
    pub fn normalize_from_env(&mut self) {
        fill_from_env(&mut self.twilio_account_sid, "TWILIO_ACCOUNT_SID");
        fill_from_env(&mut self.twilio_auth_token, "TWILIO_AUTH_TOKEN");
        fill_from_env(&mut self.from_number, "TWILIO_FROM_NUMBER");
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(anyhow!("notify.queue_capacity must be >= 1"));
        }
        if self.enabled
            && (self.twilio_account_sid.is_empty() || self.twilio_auth_token.is_empty() || self.from_number.is_empty())
        {
            return Err(anyhow!("notify is enabled but Twilio credentials or from_number are missing"));
        }
        Ok(())
    }
}

impl IdentityConfig {
    pub fn normalize_from_env(&mut self) {
        fill_from_env(&mut self.app_id, "FACEBOOK_APP_ID");
        fill_from_env(&mut self.app_secret, "FACEBOOK_APP_SECRET");
    }
}

fn fill_from_env(slot: &mut String, var: &str) {
    if slot.trim().is_empty() {
        if let Ok(v) = std::env::var(var) {
            *slot = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_session_policy() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.session.user_ttl_days, 60);
        assert_eq!(cfg.session.sweep_interval_secs, 3600);
        assert_eq!(cfg.session.write_failure_policy, WriteFailurePolicy::FailOpen);
        assert_eq!(cfg.server.status_policy, StatusPolicy::Legacy);
        assert_eq!(cfg.server.read_timeout_secs, 10);
    }

    #[test]
    fn parses_partial_toml() {
        let cfg = parse(
            r#"
            [server]
            host = "0.0.0.0"
            port = 9000
            status_policy = "mirror"

            [database]
            url = "postgres://u:p@localhost/meals"

            [session]
            write_failure_policy = "fail_closed"
            "#,
        )
        .expect("parse");
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.status_policy, StatusPolicy::Mirror);
        assert_eq!(cfg.session.write_failure_policy, WriteFailurePolicy::FailClosed);
        assert_eq!(cfg.session.user_ttl_days, 60);
        assert_eq!(cfg.database.max_connections, 10);
        assert!(cfg.database.validate().is_ok());
    }

    #[test]
    fn database_url_scheme_is_checked() {
        let db = DatabaseConfig { url: "mysql://x".into(), min_connections: 1, max_connections: 2, connect_timeout_secs: 1, acquire_timeout_secs: 1, ..Default::default() };
        assert!(db.validate().is_err());
    }

    #[test]
    fn enabled_notify_requires_credentials() {
        let n = NotifyConfig { enabled: true, ..Default::default() };
        assert!(n.validate().is_err());
        let n = NotifyConfig {
            enabled: true,
            twilio_account_sid: "AC1".into(),
            twilio_auth_token: "t".into(),
            from_number: "+15550000".into(),
            ..Default::default()
        };
        assert!(n.validate().is_ok());
    }

    #[test]
    fn zero_sweep_interval_rejected() {
        let s = SessionConfig { sweep_interval_secs: 0, ..Default::default() };
        assert!(s.validate().is_err());
    }
}
