use thiserror::Error;

use crate::notify::errors::NotifyError;
use crate::session::errors::SessionError;

/// Business errors for auth workflows
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("An account with that phone number already exists")]
    Conflict,
    #[error("No account with that phone number")]
    NotFound,
    #[error("Invalid phone number or password")]
    Unauthorized,
    #[error("Phone number not verified")]
    NotVerified,
    #[error("Invalid verification code")]
    InvalidCode,
    #[error("Invalid password reset key")]
    InvalidResetKey,
    #[error("Invalid session")]
    InvalidSession,
    #[error("hashing error: {0}")]
    HashError(String),
    #[error("repository error: {0}")]
    Repository(String),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
}

impl AuthError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            AuthError::Validation(_) => 1001,
            AuthError::Conflict => 1002,
            AuthError::NotFound => 1003,
            AuthError::Unauthorized => 1004,
            AuthError::NotVerified => 1005,
            AuthError::InvalidCode => 1006,
            AuthError::InvalidResetKey => 1007,
            AuthError::InvalidSession => 1008,
            AuthError::HashError(_) => 1101,
            AuthError::Repository(_) => 1200,
            AuthError::Session(e) => e.code(),
            AuthError::Notify(_) => 1400,
        }
    }

    /// Whether the caller, not the server, is at fault.
    pub fn is_client_error(&self) -> bool {
        self.code() < 1100
    }
}

impl From<models::errors::ModelError> for AuthError {
    fn from(e: models::errors::ModelError) -> Self {
        use models::errors::ModelError;
        match e {
            ModelError::Validation(msg) => AuthError::Validation(msg),
            ModelError::Conflict(_) => AuthError::Conflict,
            ModelError::Db(msg) => AuthError::Repository(msg),
        }
    }
}
