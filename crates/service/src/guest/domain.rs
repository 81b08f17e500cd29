use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity as reported by the third-party graph endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdentityProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Long-lived token obtained through the exchange endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExchangedToken {
    pub access_token: String,
    /// Lifetime in seconds, when the provider reports one.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Guest as seen by handlers and sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GuestProfile {
    pub id: Uuid,
    pub facebook_id: String,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GuestLogin {
    pub guest: GuestProfile,
    pub session: String,
}
