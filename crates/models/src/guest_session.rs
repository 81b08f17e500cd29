use chrono::{DateTime, Utc};
use sea_orm::{entity::prelude::*, DatabaseConnection, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;
use crate::guest;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "guest_session")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub token: String,
    pub guest_id: Uuid,
    pub expires: DateTimeWithTimeZone,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::guest::Entity",
        from = "Column::GuestId",
        to = "crate::guest::Column::Id",
        on_delete = "Cascade"
    )]
    Guest,
}

impl Related<guest::Entity> for Entity {
    fn to() -> RelationDef { Relation::Guest.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub async fn insert(db: &DatabaseConnection, token: &str, guest_id: Uuid, expires: DateTime<Utc>) -> Result<Model, ModelError> {
    let am = ActiveModel {
        token: Set(token.to_string()),
        guest_id: Set(guest_id),
        expires: Set(expires.into()),
        created_at: Set(Utc::now().into()),
    };
    am.insert(db).await.map_err(ModelError::from_db)
}

pub async fn find_live(db: &DatabaseConnection, token: &str, now: DateTime<Utc>) -> Result<Option<(Model, guest::Model)>, ModelError> {
    let now: DateTimeWithTimeZone = now.into();
    let found = Entity::find()
        .filter(Column::Token.eq(token))
        .filter(Column::Expires.gt(now))
        .find_also_related(guest::Entity)
        .one(db)
        .await
        .map_err(ModelError::from_db)?;
    Ok(found.and_then(|(s, g)| g.map(|g| (s, g))))
}

/// Longest-lived unexpired session of a guest, if any.
pub async fn find_live_by_guest(db: &DatabaseConnection, guest_id: Uuid, now: DateTime<Utc>) -> Result<Option<Model>, ModelError> {
    let now: DateTimeWithTimeZone = now.into();
    Entity::find()
        .filter(Column::GuestId.eq(guest_id))
        .filter(Column::Expires.gt(now))
        .order_by_desc(Column::Expires)
        .one(db)
        .await
        .map_err(ModelError::from_db)
}

pub async fn delete(db: &DatabaseConnection, token: &str) -> Result<u64, ModelError> {
    let res = Entity::delete_many()
        .filter(Column::Token.eq(token))
        .exec(db)
        .await
        .map_err(ModelError::from_db)?;
    Ok(res.rows_affected)
}

pub async fn delete_expired(db: &DatabaseConnection, now: DateTime<Utc>) -> Result<u64, ModelError> {
    let now: DateTimeWithTimeZone = now.into();
    let res = Entity::delete_many()
        .filter(Column::Expires.lt(now))
        .exec(db)
        .await
        .map_err(ModelError::from_db)?;
    Ok(res.rows_affected)
}
