//! Auth module: three-layer architecture (domain, repository, service).
//!
//! Phone/password registration with SMS verification, login, and password
//! reset for registered users. Successful verification and login mint a user
//! session through [`crate::session::SessionStore`].

pub mod domain;
pub mod errors;
pub mod repository;
pub mod service;
pub mod repo;

pub use service::AuthService;
