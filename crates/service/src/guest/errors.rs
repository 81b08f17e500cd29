use thiserror::Error;

use super::identity::IdentityError;
use crate::session::errors::SessionError;

#[derive(Debug, Error)]
pub enum GuestError {
    /// The identity provider did not accept the access token.
    #[error("Invalid Facebook Login")]
    InvalidLogin,
    #[error("{0}")]
    Validation(String),
    #[error("Invalid session")]
    InvalidSession,
    /// The identity provider could not be reached or answered garbage.
    #[error("identity provider unavailable: {0}")]
    Collaborator(String),
    #[error("repository error: {0}")]
    Repository(String),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl GuestError {
    pub fn code(&self) -> u16 {
        match self {
            GuestError::InvalidLogin => 2001,
            GuestError::Validation(_) => 2002,
            GuestError::InvalidSession => 2003,
            GuestError::Collaborator(_) => 2101,
            GuestError::Repository(_) => 2200,
            GuestError::Session(e) => e.code(),
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, GuestError::InvalidLogin | GuestError::Validation(_) | GuestError::InvalidSession)
    }
}

impl From<IdentityError> for GuestError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::Rejected(_) => GuestError::InvalidLogin,
            IdentityError::Unavailable(msg) => GuestError::Collaborator(msg),
        }
    }
}

impl From<models::errors::ModelError> for GuestError {
    fn from(e: models::errors::ModelError) -> Self {
        use models::errors::ModelError;
        match e {
            ModelError::Validation(msg) => GuestError::Validation(msg),
            other => GuestError::Repository(other.to_string()),
        }
    }
}
