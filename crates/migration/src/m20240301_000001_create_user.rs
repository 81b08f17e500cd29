//! Create `user` table.
//!
//! Registered hosts/eaters authenticated by phone + password. Credential
//! material (hash, salt, reset key, verification code) lives on the row.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(uuid(User::Id).primary_key())
                    .col(string_len(User::Phone, 32).unique_key().not_null())
                    .col(ColumnDef::new(User::Email).string_len(255).null())
                    .col(string_len(User::FirstName, 128).not_null())
                    .col(string_len(User::PasswordHash, 255).not_null())
                    .col(string_len(User::PasswordSalt, 64).not_null())
                    .col(ColumnDef::new(User::PasswordResetKey).string_len(64).null())
                    .col(ColumnDef::new(User::VerificationCode).string_len(16).null())
                    .col(boolean(User::Verified).not_null().default(false))
                    .col(timestamp_with_time_zone(User::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(User::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(User::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum User {
    Table,
    Id,
    Phone,
    Email,
    FirstName,
    PasswordHash,
    PasswordSalt,
    PasswordResetKey,
    VerificationCode,
    Verified,
    CreatedAt,
    UpdatedAt,
}
