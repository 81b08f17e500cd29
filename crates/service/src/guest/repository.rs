use async_trait::async_trait;

use super::domain::GuestProfile;
use super::errors::GuestError;

/// Identity details to store for a guest.
#[derive(Debug, Clone)]
pub struct GuestUpsert {
    pub facebook_id: String,
    pub name: String,
    pub email: Option<String>,
    pub long_token: Option<String>,
}

#[async_trait]
pub trait GuestRepository: Send + Sync {
    /// Create the guest for `facebook_id`, or refresh the stored name, email
    /// and long-lived token of the existing one.
    async fn upsert(&self, guest: GuestUpsert) -> Result<GuestProfile, GuestError>;
    async fn find_by_facebook_id(&self, facebook_id: &str) -> Result<Option<GuestProfile>, GuestError>;
}

pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockGuestRepository {
        rows: Mutex<HashMap<String, (GuestProfile, Option<String>)>>, // key: facebook_id
    }

    impl MockGuestRepository {
        pub fn count(&self) -> usize {
            self.rows.lock().unwrap().len()
        }

        pub fn long_token(&self, facebook_id: &str) -> Option<String> {
            self.rows.lock().unwrap().get(facebook_id).and_then(|(_, t)| t.clone())
        }
    }

    #[async_trait]
    impl GuestRepository for MockGuestRepository {
        async fn upsert(&self, guest: GuestUpsert) -> Result<GuestProfile, GuestError> {
            let mut rows = self.rows.lock().unwrap();
            let entry = rows.entry(guest.facebook_id.clone()).or_insert_with(|| {
                let profile = GuestProfile {
                    id: uuid::Uuid::new_v4(),
                    facebook_id: guest.facebook_id.clone(),
                    name: String::new(),
                    email: None,
                };
                (profile, None)
            });
            entry.0.name = guest.name;
            entry.0.email = guest.email;
            if guest.long_token.is_some() {
                entry.1 = guest.long_token;
            }
            Ok(entry.0.clone())
        }

        async fn find_by_facebook_id(&self, facebook_id: &str) -> Result<Option<GuestProfile>, GuestError> {
            Ok(self.rows.lock().unwrap().get(facebook_id).map(|(p, _)| p.clone()))
        }
    }
}
