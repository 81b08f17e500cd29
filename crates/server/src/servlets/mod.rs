//! The servlets mounted by the server, one module per path.

pub mod guest;
pub mod session;
pub mod version;

use crate::errors::StartupError;
use crate::servlet::ServletRegistry;
use crate::state::ServerState;

/// Full servlet table of the application.
pub fn registry(state: &ServerState) -> Result<ServletRegistry, StartupError> {
    ServletRegistry::new()
        .mount("/session", session::table(&state.auth))?
        .mount("/guest", guest::table(&state.guest))?
        .mount("/version", version::table(state.build.clone()))
}
