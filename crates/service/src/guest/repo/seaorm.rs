use sea_orm::DatabaseConnection;

use crate::guest::domain::GuestProfile;
use crate::guest::errors::GuestError;
use crate::guest::repository::{GuestRepository, GuestUpsert};
use models::guest;

pub struct SeaOrmGuestRepository {
    pub db: DatabaseConnection,
}

pub(crate) fn to_guest_profile(g: guest::Model) -> GuestProfile {
    GuestProfile { id: g.id, facebook_id: g.facebook_id, name: g.name, email: g.email }
}

#[async_trait::async_trait]
impl GuestRepository for SeaOrmGuestRepository {
    async fn upsert(&self, g: GuestUpsert) -> Result<GuestProfile, GuestError> {
        let saved = guest::upsert_from_identity(
            &self.db,
            &g.facebook_id,
            &g.name,
            g.email.as_deref(),
            g.long_token.as_deref(),
        )
        .await?;
        Ok(to_guest_profile(saved))
    }

    async fn find_by_facebook_id(&self, facebook_id: &str) -> Result<Option<GuestProfile>, GuestError> {
        Ok(guest::find_by_facebook_id(&self.db, facebook_id).await?.map(to_guest_profile))
    }
}
