pub mod errors;
pub mod db;
pub mod user;
pub mod guest;
pub mod user_session;
pub mod guest_session;

#[cfg(test)]
mod tests;
