use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Storage could not be read or written; `op` names the operation.
    #[error("session storage error during {op}: {message}")]
    Storage { op: &'static str, message: String },
}

impl SessionError {
    pub fn storage(op: &'static str, e: impl std::fmt::Display) -> Self {
        SessionError::Storage { op, message: e.to_string() }
    }

    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            SessionError::Storage { .. } => 1300,
        }
    }
}
