use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::domain::{GuestSession, SweepReport, UserSession};
use super::errors::SessionError;
use crate::auth::domain::AuthUser;
use crate::guest::domain::GuestProfile;

/// Persistence for both session namespaces.
///
/// Every `find_*` takes `now` and must only return rows with `expires > now`.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert_user_session(&self, token: &str, user: &AuthUser, expires: DateTime<Utc>) -> Result<(), SessionError>;
    async fn find_user_session(&self, token: &str, now: DateTime<Utc>) -> Result<Option<UserSession>, SessionError>;
    async fn delete_user_session(&self, token: &str) -> Result<(), SessionError>;

    async fn insert_guest_session(&self, token: &str, guest: &GuestProfile, expires: DateTime<Utc>) -> Result<(), SessionError>;
    async fn find_guest_session(&self, token: &str, now: DateTime<Utc>) -> Result<Option<GuestSession>, SessionError>;
    async fn find_live_guest_token(&self, guest_id: Uuid, now: DateTime<Utc>) -> Result<Option<String>, SessionError>;
    async fn delete_guest_session(&self, token: &str) -> Result<(), SessionError>;

    /// Delete rows with `expires < now` in both namespaces.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<SweepReport, SessionError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockSessionRepository {
        users: Mutex<HashMap<String, (AuthUser, DateTime<Utc>)>>,   // key: token
        guests: Mutex<HashMap<String, (GuestProfile, DateTime<Utc>)>>, // key: token
        fail_writes: AtomicBool,
        fail_reads: AtomicBool,
    }

    impl MockSessionRepository {
        pub fn fail_writes(&self, on: bool) { self.fail_writes.store(on, Ordering::SeqCst); }
        pub fn fail_reads(&self, on: bool) { self.fail_reads.store(on, Ordering::SeqCst); }

        pub fn user_rows(&self) -> usize { self.users.lock().unwrap().len() }
        pub fn guest_rows(&self) -> usize { self.guests.lock().unwrap().len() }

        pub fn has_user_row(&self, token: &str) -> bool { self.users.lock().unwrap().contains_key(token) }
        pub fn has_guest_row(&self, token: &str) -> bool { self.guests.lock().unwrap().contains_key(token) }

        fn check_write(&self, op: &'static str) -> Result<(), SessionError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(SessionError::storage(op, "injected write failure"));
            }
            Ok(())
        }

        fn check_read(&self, op: &'static str) -> Result<(), SessionError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(SessionError::storage(op, "injected read failure"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SessionRepository for MockSessionRepository {
        async fn insert_user_session(&self, token: &str, user: &AuthUser, expires: DateTime<Utc>) -> Result<(), SessionError> {
            self.check_write("insert_user_session")?;
            self.users.lock().unwrap().insert(token.to_string(), (user.clone(), expires));
            Ok(())
        }

        async fn find_user_session(&self, token: &str, now: DateTime<Utc>) -> Result<Option<UserSession>, SessionError> {
            self.check_read("find_user_session")?;
            let users = self.users.lock().unwrap();
            Ok(users.get(token).filter(|(_, exp)| *exp > now).map(|(user, exp)| UserSession {
                token: token.to_string(),
                user: user.clone(),
                expires: *exp,
            }))
        }

        async fn delete_user_session(&self, token: &str) -> Result<(), SessionError> {
            self.check_write("delete_user_session")?;
            self.users.lock().unwrap().remove(token);
            Ok(())
        }

        async fn insert_guest_session(&self, token: &str, guest: &GuestProfile, expires: DateTime<Utc>) -> Result<(), SessionError> {
            self.check_write("insert_guest_session")?;
            self.guests.lock().unwrap().insert(token.to_string(), (guest.clone(), expires));
            Ok(())
        }

        async fn find_guest_session(&self, token: &str, now: DateTime<Utc>) -> Result<Option<GuestSession>, SessionError> {
            self.check_read("find_guest_session")?;
            let guests = self.guests.lock().unwrap();
            Ok(guests.get(token).filter(|(_, exp)| *exp > now).map(|(guest, exp)| GuestSession {
                token: token.to_string(),
                guest: guest.clone(),
                expires: *exp,
            }))
        }

        async fn find_live_guest_token(&self, guest_id: Uuid, now: DateTime<Utc>) -> Result<Option<String>, SessionError> {
            self.check_read("find_live_guest_token")?;
            let guests = self.guests.lock().unwrap();
            Ok(guests
                .iter()
                .filter(|(_, (g, exp))| g.id == guest_id && *exp > now)
                .max_by_key(|(_, (_, exp))| *exp)
                .map(|(token, _)| token.clone()))
        }

        async fn delete_guest_session(&self, token: &str) -> Result<(), SessionError> {
            self.check_write("delete_guest_session")?;
            self.guests.lock().unwrap().remove(token);
            Ok(())
        }

        async fn delete_expired(&self, now: DateTime<Utc>) -> Result<SweepReport, SessionError> {
            self.check_write("delete_expired")?;
            let mut users = self.users.lock().unwrap();
            let before = users.len();
            users.retain(|_, (_, exp)| *exp >= now);
            let user_rows = (before - users.len()) as u64;
            drop(users);

            let mut guests = self.guests.lock().unwrap();
            let before = guests.len();
            guests.retain(|_, (_, exp)| *exp >= now);
            let guest_rows = (before - guests.len()) as u64;
            Ok(SweepReport { user_rows, guest_rows })
        }
    }
}
