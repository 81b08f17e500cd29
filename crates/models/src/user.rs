use chrono::Utc;
use sea_orm::{entity::prelude::*, DatabaseConnection, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub phone: String,
    pub email: Option<String>,
    pub first_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub password_salt: String,
    #[serde(skip_serializing)]
    pub password_reset_key: Option<String>,
    #[serde(skip_serializing)]
    pub verification_code: Option<String>,
    pub verified: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "crate::user_session::Entity")]
    UserSession,
}

impl Related<crate::user_session::Entity> for Entity {
    fn to() -> RelationDef { Relation::UserSession.def() }
}

impl ActiveModelBehavior for ActiveModel {}

/// Fields required to insert an unverified user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub phone: String,
    pub email: Option<String>,
    pub first_name: String,
    pub password_hash: String,
    pub password_salt: String,
    pub verification_code: String,
}

/// Reduce a phone number to digits (keeping a leading `+`).
///
/// ```
/// assert_eq!(models::user::normalize_phone("555-0100").unwrap(), "5550100");
/// assert_eq!(models::user::normalize_phone("+1 (415) 555-0100").unwrap(), "+14155550100");
/// assert!(models::user::normalize_phone("12-34").is_err());
/// ```
pub fn normalize_phone(raw: &str) -> Result<String, ModelError> {
    let trimmed = raw.trim();
    let plus = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')' | '.');
    if !trimmed.chars().all(allowed) || digits.len() < 7 || digits.len() > 15 {
        return Err(ModelError::Validation("invalid phone number".into()));
    }
    Ok(if plus { format!("+{digits}") } else { digits })
}

pub fn validate_email(email: &str) -> Result<(), ModelError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ModelError::Validation("invalid email".into())),
    }
}

pub fn validate_name(name: &str) -> Result<(), ModelError> {
    if name.trim().is_empty() {
        return Err(ModelError::Validation("first name required".into()));
    }
    if name.chars().count() > 128 {
        return Err(ModelError::Validation("first name too long".into()));
    }
    Ok(())
}

pub async fn create(db: &DatabaseConnection, new: NewUser) -> Result<Model, ModelError> {
    validate_name(&new.first_name)?;
    if let Some(email) = &new.email { validate_email(email)?; }
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        phone: Set(new.phone),
        email: Set(new.email),
        first_name: Set(new.first_name),
        password_hash: Set(new.password_hash),
        password_salt: Set(new.password_salt),
        password_reset_key: Set(None),
        verification_code: Set(Some(new.verification_code)),
        verified: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    };
    am.insert(db).await.map_err(ModelError::from_db)
}

pub async fn find_by_phone(db: &DatabaseConnection, phone: &str) -> Result<Option<Model>, ModelError> {
    Entity::find()
        .filter(Column::Phone.eq(phone))
        .one(db)
        .await
        .map_err(ModelError::from_db)
}

pub async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> Result<Option<Model>, ModelError> {
    Entity::find_by_id(id).one(db).await.map_err(ModelError::from_db)
}

async fn load_active(db: &DatabaseConnection, id: Uuid) -> Result<ActiveModel, ModelError> {
    let found = find_by_id(db, id)
        .await?
        .ok_or_else(|| ModelError::Validation("user not found".into()))?;
    Ok(found.into())
}

pub async fn set_verification_code(db: &DatabaseConnection, id: Uuid, code: &str) -> Result<(), ModelError> {
    let mut am = load_active(db, id).await?;
    am.verification_code = Set(Some(code.to_string()));
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(ModelError::from_db)?;
    Ok(())
}

pub async fn mark_verified(db: &DatabaseConnection, id: Uuid) -> Result<Model, ModelError> {
    let mut am = load_active(db, id).await?;
    am.verified = Set(true);
    am.verification_code = Set(None);
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(ModelError::from_db)
}

pub async fn set_reset_key(db: &DatabaseConnection, id: Uuid, key: Option<String>) -> Result<(), ModelError> {
    let mut am = load_active(db, id).await?;
    am.password_reset_key = Set(key);
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(ModelError::from_db)?;
    Ok(())
}

/// Replace the password material and drop any outstanding reset key.
pub async fn update_password(db: &DatabaseConnection, id: Uuid, hash: String, salt: String) -> Result<(), ModelError> {
    if hash.trim().is_empty() {
        return Err(ModelError::Validation("password hash required".into()));
    }
    let mut am = load_active(db, id).await?;
    am.password_hash = Set(hash);
    am.password_salt = Set(salt);
    am.password_reset_key = Set(None);
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(ModelError::from_db)?;
    Ok(())
}

pub async fn hard_delete(db: &DatabaseConnection, id: Uuid) -> Result<(), ModelError> {
    Entity::delete_by_id(id).exec(db).await.map_err(ModelError::from_db)?;
    Ok(())
}
