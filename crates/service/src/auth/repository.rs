use async_trait::async_trait;
use uuid::Uuid;

use super::domain::{AuthUser, Credentials, NewUserRecord};
use super::errors::AuthError;

/// Repository abstraction for auth-related persistence.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<AuthUser>, AuthError>;
    async fn create_user(&self, new: NewUserRecord) -> Result<AuthUser, AuthError>;
    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError>;

    async fn set_verification_code(&self, user_id: Uuid, code: &str) -> Result<(), AuthError>;
    async fn mark_verified(&self, user_id: Uuid) -> Result<AuthUser, AuthError>;
    async fn set_reset_key(&self, user_id: Uuid, key: Option<String>) -> Result<(), AuthError>;
    async fn update_password(&self, user_id: Uuid, password_hash: String, password_salt: String) -> Result<(), AuthError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockAuthRepository {
        users: Mutex<HashMap<String, AuthUser>>,   // key: phone
        creds: Mutex<HashMap<Uuid, Credentials>>,  // key: user_id
    }

    impl MockAuthRepository {
        /// Test hook: the outstanding verification code for `phone`.
        pub fn verification_code(&self, phone: &str) -> Option<String> {
            let id = self.users.lock().unwrap().get(phone)?.id;
            self.creds.lock().unwrap().get(&id)?.verification_code.clone()
        }

        pub fn reset_key(&self, phone: &str) -> Option<String> {
            let id = self.users.lock().unwrap().get(phone)?.id;
            self.creds.lock().unwrap().get(&id)?.password_reset_key.clone()
        }

        pub fn user_count(&self) -> usize {
            self.users.lock().unwrap().len()
        }

        fn with_user<T>(&self, user_id: Uuid, f: impl FnOnce(&mut AuthUser) -> T) -> Result<T, AuthError> {
            let mut users = self.users.lock().unwrap();
            let user = users.values_mut().find(|u| u.id == user_id).ok_or(AuthError::NotFound)?;
            Ok(f(user))
        }

        fn with_creds<T>(&self, user_id: Uuid, f: impl FnOnce(&mut Credentials) -> T) -> Result<T, AuthError> {
            let mut creds = self.creds.lock().unwrap();
            let c = creds.get_mut(&user_id).ok_or(AuthError::NotFound)?;
            Ok(f(c))
        }
    }

    #[async_trait]
    impl AuthRepository for MockAuthRepository {
        async fn find_user_by_phone(&self, phone: &str) -> Result<Option<AuthUser>, AuthError> {
            Ok(self.users.lock().unwrap().get(phone).cloned())
        }

        async fn create_user(&self, new: NewUserRecord) -> Result<AuthUser, AuthError> {
            let mut users = self.users.lock().unwrap();
            if users.contains_key(&new.phone) {
                return Err(AuthError::Conflict);
            }
            let user = AuthUser {
                id: Uuid::new_v4(),
                phone: new.phone.clone(),
                first_name: new.first_name,
                email: new.email,
                verified: false,
            };
            users.insert(new.phone, user.clone());
            self.creds.lock().unwrap().insert(user.id, Credentials {
                user_id: user.id,
                password_hash: new.password_hash,
                password_salt: new.password_salt,
                password_reset_key: None,
                verification_code: Some(new.verification_code),
            });
            Ok(user)
        }

        async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
            Ok(self.creds.lock().unwrap().get(&user_id).cloned())
        }

        async fn set_verification_code(&self, user_id: Uuid, code: &str) -> Result<(), AuthError> {
            self.with_creds(user_id, |c| c.verification_code = Some(code.to_string()))
        }

        async fn mark_verified(&self, user_id: Uuid) -> Result<AuthUser, AuthError> {
            self.with_creds(user_id, |c| c.verification_code = None)?;
            self.with_user(user_id, |u| {
                u.verified = true;
                u.clone()
            })
        }

        async fn set_reset_key(&self, user_id: Uuid, key: Option<String>) -> Result<(), AuthError> {
            self.with_creds(user_id, |c| c.password_reset_key = key)
        }

        async fn update_password(&self, user_id: Uuid, password_hash: String, password_salt: String) -> Result<(), AuthError> {
            self.with_creds(user_id, |c| {
                c.password_hash = password_hash;
                c.password_salt = password_salt;
                c.password_reset_key = None;
            })
        }
    }
}
