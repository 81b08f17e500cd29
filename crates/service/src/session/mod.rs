//! Session module: two token-keyed namespaces (registered users, guests)
//! persisted in the database and checked against an expiry clock.
//!
//! The database row is the only record of a session; nothing is cached in
//! process. A periodic sweep deletes expired rows to bound table growth, but
//! validation filters on expiry itself and never depends on sweep timing.

pub mod clock;
pub mod domain;
pub mod errors;
pub mod repo;
pub mod repository;
pub mod store;
pub mod sweeper;

pub use store::{SessionPolicy, SessionStore};
