use std::sync::Arc;

use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use common::types::SmsMessage;
use common::utils::token;
use rand::rngs::OsRng;
use tracing::{debug, info, instrument};

use super::domain::{AuthSession, AuthUser, LoginInput, NewUserRecord, RegisterInput, ResetPasswordInput, VerifyInput};
use super::errors::AuthError;
use super::repository::AuthRepository;
use crate::notify::Notifier;
use crate::session::SessionStore;

/// Auth service configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub min_password_len: usize,
    pub verification_code_len: usize,
    pub reset_key_len: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { min_password_len: 8, verification_code_len: 6, reset_key_len: 12 }
    }
}

/// Registered-user workflows, independent of the transport.
pub struct AuthService {
    repo: Arc<dyn AuthRepository>,
    sessions: Arc<SessionStore>,
    notifier: Notifier,
    cfg: AuthConfig,
}

impl AuthService {
    pub fn new(repo: Arc<dyn AuthRepository>, sessions: Arc<SessionStore>, notifier: Notifier, cfg: AuthConfig) -> Self {
        Self { repo, sessions, notifier, cfg }
    }

    /// Register an unverified user and text them a verification code.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::RegisterInput;
    /// use service::notify::Notifier;
    /// use service::session::{SessionStore, SessionPolicy, clock, repository::mock::MockSessionRepository};
    /// let sessions = Arc::new(SessionStore::new(Arc::new(MockSessionRepository::default()), clock::system_clock(), SessionPolicy::default()));
    /// let (notifier, _rx) = Notifier::channel(4);
    /// let svc = AuthService::new(Arc::new(MockAuthRepository::default()), sessions, notifier, AuthConfig::default());
    /// let input = RegisterInput { phone: "555-0100".into(), password: "Secret123".into(), first_name: "Ada".into(), email: None };
    /// let user = tokio_test::block_on(svc.register(input)).unwrap();
    /// assert_eq!(user.phone, "5550100");
    /// assert!(!user.verified);
    /// ```
    #[instrument(skip(self, input), fields(phone = %input.phone))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthUser, AuthError> {
        let phone = models::user::normalize_phone(&input.phone)?;
        models::user::validate_name(&input.first_name)?;
        let email = match input.email.as_deref().map(str::trim) {
            Some("") | None => None,
            Some(e) => {
                models::user::validate_email(e)?;
                Some(e.to_string())
            }
        };
        self.check_password(&input.password)?;

        if let Some(existing) = self.repo.find_user_by_phone(&phone).await? {
            debug!(user_id = %existing.id, "phone already registered");
            return Err(AuthError::Conflict);
        }

        let (password_hash, password_salt) = hash_password(&input.password)?;
        let code = token::numeric_code(self.cfg.verification_code_len);
        let user = self.repo.create_user(NewUserRecord {
            phone: phone.clone(),
            first_name: input.first_name.trim().to_string(),
            email,
            password_hash,
            password_salt,
            verification_code: code.clone(),
        }).await?;

        self.notifier.enqueue(verification_sms(&phone, &code)).await?;
        info!(user_id = %user.id, "user_registered");
        Ok(user)
    }

    /// Issue a fresh verification code to an unverified user.
    #[instrument(skip(self))]
    pub async fn send_verification(&self, phone: &str) -> Result<(), AuthError> {
        let phone = models::user::normalize_phone(phone)?;
        let user = self.repo.find_user_by_phone(&phone).await?.ok_or(AuthError::NotFound)?;
        if user.verified {
            return Err(AuthError::Validation("Phone number already verified".into()));
        }
        let code = token::numeric_code(self.cfg.verification_code_len);
        self.repo.set_verification_code(user.id, &code).await?;
        self.notifier.enqueue(verification_sms(&phone, &code)).await?;
        info!(user_id = %user.id, "verification_code_sent");
        Ok(())
    }

    /// Confirm the SMS code; on success the user is verified and logged in.
    #[instrument(skip(self, input), fields(phone = %input.phone))]
    pub async fn verify(&self, input: VerifyInput) -> Result<AuthSession, AuthError> {
        let phone = models::user::normalize_phone(&input.phone).map_err(|_| AuthError::InvalidCode)?;
        let user = self.repo.find_user_by_phone(&phone).await?.ok_or(AuthError::InvalidCode)?;
        let cred = self.repo.get_credentials(user.id).await?.ok_or(AuthError::InvalidCode)?;
        match cred.verification_code.as_deref() {
            Some(expected) if !expected.is_empty() && expected == input.code.trim() => {}
            _ => return Err(AuthError::InvalidCode),
        }

        let user = self.repo.mark_verified(user.id).await?;
        let session = self.sessions.create_user_session(&user).await?;
        info!(user_id = %user.id, "user_verified");
        Ok(AuthSession { user, session })
    }

    /// Authenticate a verified user and mint a session.
    #[instrument(skip(self, input), fields(phone = %input.phone))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let phone = models::user::normalize_phone(&input.phone).map_err(|_| AuthError::Unauthorized)?;
        let user = self.repo.find_user_by_phone(&phone).await?.ok_or(AuthError::Unauthorized)?;
        let cred = self.repo.get_credentials(user.id).await?.ok_or(AuthError::Unauthorized)?;
        if !verify_password(&input.password, &cred.password_hash)? {
            return Err(AuthError::Unauthorized);
        }
        if !user.verified {
            return Err(AuthError::NotVerified);
        }

        let session = self.sessions.create_user_session(&user).await?;
        info!(user_id = %user.id, "user_logged_in");
        Ok(AuthSession { user, session })
    }

    pub async fn logout(&self, session: &str) -> Result<(), AuthError> {
        self.sessions.destroy_user(session).await?;
        Ok(())
    }

    /// The user owning a live session.
    pub async fn check(&self, session: &str) -> Result<AuthUser, AuthError> {
        self.sessions
            .validate_user(session)
            .await?
            .map(|s| s.user)
            .ok_or(AuthError::InvalidSession)
    }

    /// Store a reset key and text it. Unknown phones get the same answer as
    /// known ones so the endpoint cannot be used to enumerate accounts.
    #[instrument(skip(self))]
    pub async fn request_reset(&self, phone: &str) -> Result<(), AuthError> {
        let phone = models::user::normalize_phone(phone)?;
        let Some(user) = self.repo.find_user_by_phone(&phone).await? else {
            debug!("reset requested for unknown phone");
            return Ok(());
        };
        let key = token::reset_key(self.cfg.reset_key_len);
        self.repo.set_reset_key(user.id, Some(key.clone())).await?;
        self.notifier
            .enqueue(SmsMessage::new(&phone, format!("Your Mealshare password reset key is {key}")))
            .await?;
        info!(user_id = %user.id, "password_reset_requested");
        Ok(())
    }

    /// Replace the password when `key` matches the outstanding reset key.
    /// Existing sessions stay valid.
    #[instrument(skip(self, input), fields(phone = %input.phone))]
    pub async fn reset_password(&self, input: ResetPasswordInput) -> Result<(), AuthError> {
        let phone = models::user::normalize_phone(&input.phone).map_err(|_| AuthError::InvalidResetKey)?;
        let user = self.repo.find_user_by_phone(&phone).await?.ok_or(AuthError::InvalidResetKey)?;
        let cred = self.repo.get_credentials(user.id).await?.ok_or(AuthError::InvalidResetKey)?;
        match cred.password_reset_key.as_deref() {
            Some(expected) if !expected.is_empty() && expected == input.key.trim() => {}
            _ => return Err(AuthError::InvalidResetKey),
        }
        self.check_password(&input.password)?;

        let (hash, salt) = hash_password(&input.password)?;
        self.repo.update_password(user.id, hash, salt).await?;
        info!(user_id = %user.id, "password_reset");
        Ok(())
    }

    fn check_password(&self, password: &str) -> Result<(), AuthError> {
        if password.chars().count() < self.cfg.min_password_len {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                self.cfg.min_password_len
            )));
        }
        Ok(())
    }
}

fn verification_sms(phone: &str, code: &str) -> SmsMessage {
    SmsMessage::new(phone, format!("Your Mealshare verification code is {code}"))
}

/// Argon2 PHC string plus the salt it embeds, stored side by side.
fn hash_password(password: &str) -> Result<(String, String), AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::HashError(e.to_string()))?
        .to_string();
    Ok((hash, salt.as_str().to_string()))
}

fn verify_password(password: &str, stored: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored).map_err(|e| AuthError::HashError(e.to_string()))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}
