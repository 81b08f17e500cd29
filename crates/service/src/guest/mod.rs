//! Guest module: visitors who sign in with a Facebook access token instead of
//! registering. The token is checked against the Graph API, exchanged for a
//! long-lived one, and the guest row is created or refreshed before a guest
//! session is handed out.

pub mod domain;
pub mod errors;
pub mod identity;
pub mod repository;
pub mod service;
pub mod repo;

pub use service::GuestService;
