use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registration input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterInput {
    pub phone: String,
    pub password: String,
    pub first_name: String,
    pub email: Option<String>,
}

/// Login input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginInput {
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyInput {
    pub phone: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordInput {
    pub phone: String,
    pub key: String,
    pub password: String,
}

/// Domain user (business view). Carries no credential material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthUser {
    pub id: Uuid,
    pub phone: String,
    pub first_name: String,
    pub email: Option<String>,
    pub verified: bool,
}

/// Everything needed to create a user row.
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub phone: String,
    pub first_name: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub password_salt: String,
    pub verification_code: String,
}

/// Credential material; stays inside the auth service and its repository.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user_id: Uuid,
    pub password_hash: String,
    pub password_salt: String,
    pub password_reset_key: Option<String>,
    pub verification_code: Option<String>,
}

/// Login result (session)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthSession {
    pub user: AuthUser,
    pub session: String,
}
