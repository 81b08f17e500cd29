use serde::{Deserialize, Serialize};

/// Build identity reported by the unauthenticated version endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    #[serde(rename = "Build")]
    pub build: String,
    #[serde(rename = "Version")]
    pub version: String,
}

/// Outbound SMS handed from request handlers to the notification worker.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SmsMessage {
    pub to: String,
    pub message: String,
}

impl SmsMessage {
    pub fn new(to: impl Into<String>, message: impl Into<String>) -> Self {
        Self { to: to.into(), message: message.into() }
    }
}
