use std::sync::Arc;

use common::types::BuildInfo;
use service::auth::AuthService;
use service::guest::GuestService;

/// Services the servlets are built from. Cheap to clone.
#[derive(Clone)]
pub struct ServerState {
    pub auth: Arc<AuthService>,
    pub guest: Arc<GuestService>,
    pub build: BuildInfo,
}
