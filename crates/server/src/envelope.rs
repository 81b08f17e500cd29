//! The uniform result shape every servlet operation produces.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use service::errors::ServiceError;

/// Message sent to clients for every server-side failure.
pub const GENERIC_SERVER_ERROR: &str = "Internal server error";

/// Outcome of one servlet operation.
///
/// A well-formed envelope is either a success (`error_message` empty, status
/// 200) or a failure (`payload` empty, an error message, status 400..=599).
/// The dispatcher checks this with [`Envelope::validate`] and replaces
/// anything else with a generic server error.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub success: bool,
    pub payload: Option<Value>,
    pub error_message: Option<String>,
    pub status_code: u16,
}

/// Wire form: `{"Success": 0|1, "Return": .., "Error": ..}`.
#[derive(Serialize)]
struct Wire<'a> {
    #[serde(rename = "Success")]
    success: u8,
    #[serde(rename = "Return")]
    payload: Option<&'a Value>,
    #[serde(rename = "Error")]
    error: Option<&'a str>,
}

impl Envelope {
    /// Success carrying `payload`. A payload that cannot be represented as
    /// JSON turns into a server error.
    pub fn success<T: Serialize>(payload: T) -> Self {
        match serde_json::to_value(payload) {
            Ok(v) => Self { success: true, payload: Some(v), error_message: None, status_code: 200 },
            Err(e) => {
                error!(error = %e, "payload serialization failed");
                Self::server_error()
            }
        }
    }

    /// Success with `"Return": null`.
    pub fn ok() -> Self {
        Self { success: true, payload: None, error_message: None, status_code: 200 }
    }

    pub fn client_error(message: impl Into<String>) -> Self {
        Self::error_with_code(message, 400)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::error_with_code(message, 404)
    }

    pub fn server_error() -> Self {
        Self::error_with_code(GENERIC_SERVER_ERROR, 500)
    }

    pub fn error_with_code(message: impl Into<String>, status_code: u16) -> Self {
        Self { success: false, payload: None, error_message: Some(message.into()), status_code }
    }

    /// Turn a service failure into an envelope. Client errors carry their
    /// message; everything else is logged here and answered generically.
    pub fn from_service_error(err: impl Into<ServiceError>, op: &'static str) -> Self {
        let err = err.into();
        if err.is_client_error() {
            debug!(op, code = err.code(), error = %err, "client error");
            Self::client_error(err.to_string())
        } else {
            error!(op, code = err.code(), error = %err, "operation failed");
            Self::server_error()
        }
    }

    /// Check the success/failure invariants; `Err` names the broken one.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.success {
            if self.error_message.is_some() {
                return Err("successful envelope carries an error message");
            }
            if self.status_code != 200 {
                return Err("successful envelope has a non-200 status");
            }
        } else {
            if self.payload.is_some() {
                return Err("failed envelope carries a payload");
            }
            if self.error_message.as_deref().map_or(true, str::is_empty) {
                return Err("failed envelope has no error message");
            }
            if !(400..=599).contains(&self.status_code) {
                return Err("failed envelope status is not an error status");
            }
        }
        Ok(())
    }

    /// Pretty-printed wire body.
    pub fn to_body(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(&Wire {
            success: u8::from(self.success),
            payload: self.payload.as_ref(),
            error: self.error_message.as_deref(),
        })
    }
}

/// Anything an operation may return: an envelope, or nothing at all (which
/// the dispatcher reports as a server error).
pub trait HandlerOutput: Send + 'static {
    fn into_envelope(self) -> Option<Envelope>;
}

impl HandlerOutput for Envelope {
    fn into_envelope(self) -> Option<Envelope> {
        Some(self)
    }
}

impl HandlerOutput for Option<Envelope> {
    fn into_envelope(self) -> Option<Envelope> {
        self
    }
}

/// Lets operations bail out early with `?` on a failure envelope.
impl HandlerOutput for Result<Envelope, Envelope> {
    fn into_envelope(self) -> Option<Envelope> {
        Some(self.unwrap_or_else(|failure| failure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use service::auth::errors::AuthError;
    use service::session::errors::SessionError;

    #[test]
    fn wire_shape() {
        let body = Envelope::success(json!({"Build": "abc"})).to_body().unwrap();
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v, json!({"Success": 1, "Return": {"Build": "abc"}, "Error": null}));

        let body = Envelope::not_found("nope").to_body().unwrap();
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v, json!({"Success": 0, "Return": null, "Error": "nope"}));
        // pretty printed
        assert!(String::from_utf8(body).unwrap().contains('\n'));
    }

    #[test]
    fn constructors_are_well_formed() {
        for env in [
            Envelope::ok(),
            Envelope::success(42),
            Envelope::client_error("bad"),
            Envelope::not_found("missing"),
            Envelope::server_error(),
            Envelope::error_with_code("teapot", 418),
        ] {
            assert_eq!(env.validate(), Ok(()), "{env:?}");
        }
    }

    #[test]
    fn malformed_envelopes_are_caught() {
        let mut e = Envelope::ok();
        e.error_message = Some("x".into());
        assert!(e.validate().is_err());

        let mut e = Envelope::client_error("x");
        e.payload = Some(json!(1));
        assert!(e.validate().is_err());

        let mut e = Envelope::client_error("x");
        e.status_code = 200;
        assert!(e.validate().is_err());

        let mut e = Envelope::ok();
        e.status_code = 201;
        assert!(e.validate().is_err());
    }

    #[test]
    fn service_errors_hide_server_detail() {
        let env = Envelope::from_service_error(AuthError::InvalidCode, "verify");
        assert_eq!(env.error_message.as_deref(), Some("Invalid verification code"));
        assert_eq!(env.status_code, 400);

        let env = Envelope::from_service_error(SessionError::storage("insert_user_session", "connection reset"), "login");
        assert_eq!(env.error_message.as_deref(), Some(GENERIC_SERVER_ERROR));
        assert_eq!(env.status_code, 500);
    }
}
