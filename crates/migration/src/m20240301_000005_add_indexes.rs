use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Sweep deletes by expiry
        manager
            .create_index(
                Index::create()
                    .name("idx_user_session_expires")
                    .table(UserSession::Table)
                    .col(UserSession::Expires)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_guest_session_expires")
                    .table(GuestSession::Table)
                    .col(GuestSession::Expires)
                    .to_owned(),
            )
            .await?;

        // Live-session reuse looks guests up by identity
        manager
            .create_index(
                Index::create()
                    .name("idx_guest_session_guest")
                    .table(GuestSession::Table)
                    .col(GuestSession::GuestId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_user_session_user")
                    .table(UserSession::Table)
                    .col(UserSession::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_user_session_expires").table(UserSession::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_guest_session_expires").table(GuestSession::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_guest_session_guest").table(GuestSession::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_user_session_user").table(UserSession::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserSession { Table, Expires, UserId }

#[derive(DeriveIden)]
enum GuestSession { Table, Expires, GuestId }
