use chrono::Utc;
use sea_orm::{entity::prelude::*, DatabaseConnection, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "guest")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub facebook_id: String,
    pub name: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub facebook_long_token: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "crate::guest_session::Entity")]
    GuestSession,
}

impl Related<crate::guest_session::Entity> for Entity {
    fn to() -> RelationDef { Relation::GuestSession.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub async fn find_by_facebook_id(db: &DatabaseConnection, facebook_id: &str) -> Result<Option<Model>, ModelError> {
    Entity::find()
        .filter(Column::FacebookId.eq(facebook_id))
        .one(db)
        .await
        .map_err(ModelError::from_db)
}

/// Insert the guest on first sight, otherwise refresh profile fields and token.
///
/// Two first logins racing on the same facebook id both miss the lookup; the
/// loser of the insert hits the unique index and refreshes the winner's row.
pub async fn upsert_from_identity(
    db: &DatabaseConnection,
    facebook_id: &str,
    name: &str,
    email: Option<&str>,
    long_token: Option<&str>,
) -> Result<Model, ModelError> {
    if facebook_id.trim().is_empty() {
        return Err(ModelError::Validation("facebook id required".into()));
    }
    if let Some(existing) = find_by_facebook_id(db, facebook_id).await? {
        return refresh(db, existing, name, email, long_token).await;
    }

    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        facebook_id: Set(facebook_id.to_string()),
        name: Set(name.to_string()),
        email: Set(email.map(str::to_string)),
        facebook_long_token: Set(long_token.map(str::to_string)),
        created_at: Set(now),
        updated_at: Set(now),
    };
    match am.insert(db).await.map_err(ModelError::from_db) {
        Err(ModelError::Conflict(_)) => match find_by_facebook_id(db, facebook_id).await? {
            Some(existing) => refresh(db, existing, name, email, long_token).await,
            None => Err(ModelError::Conflict(format!("guest {facebook_id} vanished after insert conflict"))),
        },
        other => other,
    }
}

async fn refresh(
    db: &DatabaseConnection,
    existing: Model,
    name: &str,
    email: Option<&str>,
    long_token: Option<&str>,
) -> Result<Model, ModelError> {
    let mut am: ActiveModel = existing.into();
    am.name = Set(name.to_string());
    am.email = Set(email.map(str::to_string));
    if let Some(tok) = long_token {
        am.facebook_long_token = Set(Some(tok.to_string()));
    }
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(ModelError::from_db)
}

pub async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> Result<Option<Model>, ModelError> {
    Entity::find_by_id(id).one(db).await.map_err(ModelError::from_db)
}
