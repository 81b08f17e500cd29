use chrono::{DateTime, Utc};
use sea_orm::{entity::prelude::*, DatabaseConnection, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;
use crate::user;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_session")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub token: String,
    pub user_id: Uuid,
    pub expires: DateTimeWithTimeZone,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::user::Entity",
        from = "Column::UserId",
        to = "crate::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef { Relation::User.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub async fn insert(db: &DatabaseConnection, token: &str, user_id: Uuid, expires: DateTime<Utc>) -> Result<Model, ModelError> {
    let am = ActiveModel {
        token: Set(token.to_string()),
        user_id: Set(user_id),
        expires: Set(expires.into()),
        created_at: Set(Utc::now().into()),
    };
    am.insert(db).await.map_err(ModelError::from_db)
}

/// Row with `token` whose expiry lies after `now`, joined with its user.
pub async fn find_live(db: &DatabaseConnection, token: &str, now: DateTime<Utc>) -> Result<Option<(Model, user::Model)>, ModelError> {
    let now: DateTimeWithTimeZone = now.into();
    let found = Entity::find()
        .filter(Column::Token.eq(token))
        .filter(Column::Expires.gt(now))
        .find_also_related(user::Entity)
        .one(db)
        .await
        .map_err(ModelError::from_db)?;
    Ok(found.and_then(|(s, u)| u.map(|u| (s, u))))
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
