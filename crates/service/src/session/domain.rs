use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::domain::AuthUser;
use crate::guest::domain::GuestProfile;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserSession {
    pub token: String,
    pub user: AuthUser,
    pub expires: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GuestSession {
    pub token: String,
    pub guest: GuestProfile,
    pub expires: DateTime<Utc>,
}

/// Rows removed by one sweep, per namespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub user_rows: u64,
    pub guest_rows: u64,
}

impl SweepReport {
    pub fn total(&self) -> u64 {
        self.user_rows + self.guest_rows
    }
}
