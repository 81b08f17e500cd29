use std::sync::Arc;

use serde::Serialize;
use service::guest::domain::GuestProfile;
use service::guest::GuestService;

use crate::envelope::Envelope;
use crate::servlet::{bind, MethodTable, ServletRequest};

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GuestView {
    guest: GuestProfile,
}

/// `/guest`: Facebook sign-in for visitors without an account.
pub fn table(guest: &Arc<GuestService>) -> MethodTable {
    MethodTable::new("guest")
        .op("Login", bind(guest, login))
        .op("Logout", bind(guest, logout))
        .op("Check", bind(guest, check))
}

async fn login(svc: Arc<GuestService>, req: ServletRequest) -> Result<Envelope, Envelope> {
    let token = req.require("fb_token")?;
    let login = svc.login(token).await.map_err(|e| Envelope::from_service_error(e, "guest.login"))?;
    Ok(Envelope::success(login))
}

async fn logout(svc: Arc<GuestService>, req: ServletRequest) -> Result<Envelope, Envelope> {
    let session = req.require("session")?;
    svc.logout(session).await.map_err(|e| Envelope::from_service_error(e, "guest.logout"))?;
    Ok(Envelope::ok())
}

async fn check(svc: Arc<GuestService>, req: ServletRequest) -> Result<Envelope, Envelope> {
    let session = req.require("session")?;
    let guest = svc.check(session).await.map_err(|e| Envelope::from_service_error(e, "guest.check"))?;
    Ok(Envelope::success(GuestView { guest }))
}
