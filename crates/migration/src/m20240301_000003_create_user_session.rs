//! Create `user_session` table with FK to `user`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserSession::Table)
                    .if_not_exists()
                    .col(string_len(UserSession::Token, 64).primary_key())
                    .col(uuid(UserSession::UserId).not_null())
                    .col(timestamp_with_time_zone(UserSession::Expires).not_null())
                    .col(timestamp_with_time_zone(UserSession::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_session_user")
                            .from(UserSession::Table, UserSession::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(UserSession::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum UserSession { Table, Token, UserId, Expires, CreatedAt }

#[derive(DeriveIden)]
enum User { Table, Id }
