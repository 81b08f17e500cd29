use thiserror::Error;

use crate::auth::errors::AuthError;
use crate::guest::errors::GuestError;
use crate::notify::errors::NotifyError;
use crate::session::errors::SessionError;

/// Any failure a handler can get back from the service layer.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Guest(#[from] GuestError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
}

impl ServiceError {
    pub fn code(&self) -> u16 {
        match self {
            ServiceError::Auth(e) => e.code(),
            ServiceError::Guest(e) => e.code(),
            ServiceError::Session(e) => e.code(),
            ServiceError::Notify(_) => 1400,
        }
    }

    /// Client errors carry a message fit for the response body; everything
    /// else is reported generically and detailed only in logs.
    pub fn is_client_error(&self) -> bool {
        match self {
            ServiceError::Auth(e) => e.is_client_error(),
            ServiceError::Guest(e) => e.is_client_error(),
            ServiceError::Session(_) | ServiceError::Notify(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_follows_the_inner_error() {
        let e: ServiceError = AuthError::InvalidCode.into();
        assert!(e.is_client_error());
        assert_eq!(e.to_string(), "Invalid verification code");

        let e: ServiceError = AuthError::Session(SessionError::storage("insert_user_session", "down")).into();
        assert!(!e.is_client_error());
        assert_eq!(e.code(), 1300);

        let e: ServiceError = GuestError::InvalidLogin.into();
        assert!(e.is_client_error());
        assert!(!ServiceError::from(NotifyError::QueueClosed).is_client_error());
    }
}
