//! `/session`: registration, SMS verification, login and password reset for
//! registered users.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use service::auth::domain::{AuthUser, LoginInput, RegisterInput, ResetPasswordInput, VerifyInput};
use service::auth::AuthService;

use crate::envelope::Envelope;
use crate::servlet::{bind, MethodTable, ServletRequest};

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Registered {
    user_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct UserView {
    user: AuthUser,
}

pub fn table(auth: &Arc<AuthService>) -> MethodTable {
    MethodTable::new("session")
        .op("Register", bind(auth, register))
        .op("SendVerification", bind(auth, send_verification))
        .op("Verify", bind(auth, verify))
        .op("Login", bind(auth, login))
        .op("Logout", bind(auth, logout))
        .op("Check", bind(auth, check))
        .op("RequestReset", bind(auth, request_reset))
        .op("ResetPassword", bind(auth, reset_password))
}

fn failed(op: &'static str) -> impl FnOnce(service::auth::errors::AuthError) -> Envelope {
    move |e| Envelope::from_service_error(e, op)
}

async fn register(auth: Arc<AuthService>, req: ServletRequest) -> Result<Envelope, Envelope> {
    let input = RegisterInput {
        phone: req.require("phone")?.to_string(),
        password: req.require_raw("password")?.to_string(),
        first_name: req.require("first_name")?.to_string(),
        email: req.param("email").map(str::to_string),
    };
    let user = auth.register(input).await.map_err(failed("session.register"))?;
    Ok(Envelope::success(Registered { user_id: user.id }))
}

async fn send_verification(auth: Arc<AuthService>, req: ServletRequest) -> Result<Envelope, Envelope> {
    let phone = req.require("phone")?;
    auth.send_verification(phone).await.map_err(failed("session.send_verification"))?;
    Ok(Envelope::ok())
}

async fn verify(auth: Arc<AuthService>, req: ServletRequest) -> Result<Envelope, Envelope> {
    let input = VerifyInput { phone: req.require("phone")?.to_string(), code: req.require("code")?.to_string() };
    let session = auth.verify(input).await.map_err(failed("session.verify"))?;
    Ok(Envelope::success(session))
}

async fn login(auth: Arc<AuthService>, req: ServletRequest) -> Result<Envelope, Envelope> {
    let input = LoginInput {
        phone: req.require("phone")?.to_string(),
        password: req.require_raw("password")?.to_string(),
    };
    let session = auth.login(input).await.map_err(failed("session.login"))?;
    Ok(Envelope::success(session))
}

async fn logout(auth: Arc<AuthService>, req: ServletRequest) -> Result<Envelope, Envelope> {
    auth.logout(req.require("session")?).await.map_err(failed("session.logout"))?;
    Ok(Envelope::ok())
}

async fn check(auth: Arc<AuthService>, req: ServletRequest) -> Result<Envelope, Envelope> {
    let user = auth.check(req.require("session")?).await.map_err(failed("session.check"))?;
    Ok(Envelope::success(UserView { user }))
}

async fn request_reset(auth: Arc<AuthService>, req: ServletRequest) -> Result<Envelope, Envelope> {
    auth.request_reset(req.require("phone")?).await.map_err(failed("session.request_reset"))?;
    Ok(Envelope::ok())
}

async fn reset_password(auth: Arc<AuthService>, req: ServletRequest) -> Result<Envelope, Envelope> {
    let input = ResetPasswordInput {
        phone: req.require("phone")?.to_string(),
        key: req.require("key")?.to_string(),
        password: req.require_raw("password")?.to_string(),
    };
    auth.reset_password(input).await.map_err(failed("session.reset_password"))?;
    Ok(Envelope::ok())
}
