//! Create `guest` table.
//!
//! Guests sign in through Facebook; `facebook_id` is the identity key.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Guest::Table)
                    .if_not_exists()
                    .col(uuid(Guest::Id).primary_key())
                    .col(string_len(Guest::FacebookId, 64).unique_key().not_null())
                    .col(string_len(Guest::Name, 128).not_null())
                    .col(ColumnDef::new(Guest::Email).string_len(255).null())
                    .col(ColumnDef::new(Guest::FacebookLongToken).text().null())
                    .col(timestamp_with_time_zone(Guest::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Guest::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Guest::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Guest { Table, Id, FacebookId, Name, Email, FacebookLongToken, CreatedAt, UpdatedAt }
