//! Service layer: sessions, user/guest authentication and SMS delivery.
//! - Separates business logic from data access (`repository` traits per area).
//! - Reuses entity definitions and validation from the `models` crate.
//! - Every area exposes its own error type with a client/server classification.

pub mod auth;
pub mod errors;
pub mod guest;
pub mod notify;
pub mod runtime;
pub mod session;

mod test_support;
