//! Shared building blocks used by every crate in the workspace:
//! logging bootstrap, opaque token generation and a few wire types.

pub mod types;
pub mod utils;
