//! Create `guest_session` table with FK to `guest`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GuestSession::Table)
                    .if_not_exists()
                    .col(string_len(GuestSession::Token, 64).primary_key())
                    .col(uuid(GuestSession::GuestId).not_null())
                    .col(timestamp_with_time_zone(GuestSession::Expires).not_null())
                    .col(timestamp_with_time_zone(GuestSession::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_guest_session_guest")
                            .from(GuestSession::Table, GuestSession::GuestId)
                            .to(Guest::Table, Guest::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(GuestSession::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum GuestSession { Table, Token, GuestId, Expires, CreatedAt }

#[derive(DeriveIden)]
enum Guest { Table, Id }
