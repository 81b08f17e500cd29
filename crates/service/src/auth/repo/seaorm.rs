use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::auth::domain::{AuthUser, Credentials, NewUserRecord};
use crate::auth::errors::AuthError;
use crate::auth::repository::AuthRepository;
use models::user;

pub struct SeaOrmAuthRepository {
    pub db: DatabaseConnection,
}

pub(crate) fn to_auth_user(u: user::Model) -> AuthUser {
    AuthUser { id: u.id, phone: u.phone, first_name: u.first_name, email: u.email, verified: u.verified }
}

#[async_trait::async_trait]
impl AuthRepository for SeaOrmAuthRepository {
    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<AuthUser>, AuthError> {
        let res = user::find_by_phone(&self.db, phone).await?;
        Ok(res.map(to_auth_user))
    }

    async fn create_user(&self, new: NewUserRecord) -> Result<AuthUser, AuthError> {
        let created = user::create(&self.db, user::NewUser {
            phone: new.phone,
            email: new.email,
            first_name: new.first_name,
            password_hash: new.password_hash,
            password_salt: new.password_salt,
            verification_code: new.verification_code,
        })
        .await?;
        Ok(to_auth_user(created))
    }

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
        let res = user::find_by_id(&self.db, user_id).await?;
        Ok(res.map(|u| Credentials {
            user_id: u.id,
            password_hash: u.password_hash,
            password_salt: u.password_salt,
            password_reset_key: u.password_reset_key,
            verification_code: u.verification_code,
        }))
    }

    async fn set_verification_code(&self, user_id: Uuid, code: &str) -> Result<(), AuthError> {
        Ok(user::set_verification_code(&self.db, user_id, code).await?)
    }

    async fn mark_verified(&self, user_id: Uuid) -> Result<AuthUser, AuthError> {
        let updated = user::mark_verified(&self.db, user_id).await?;
        Ok(to_auth_user(updated))
    }

    async fn set_reset_key(&self, user_id: Uuid, key: Option<String>) -> Result<(), AuthError> {
        Ok(user::set_reset_key(&self.db, user_id, key).await?)
    }

    async fn update_password(&self, user_id: Uuid, password_hash: String, password_salt: String) -> Result<(), AuthError> {
        Ok(user::update_password(&self.db, user_id, password_hash, password_salt).await?)
    }
}
