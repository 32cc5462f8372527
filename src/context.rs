use std::future::{ready, Ready};

use actix_web::error::{ErrorBadRequest, ErrorUnauthorized};
use actix_web::web::Data;
use actix_web::{dev::Payload, FromRequest, HttpRequest};
use serde::Serialize;

use crate::core::ports::tokener::Tokener;
use crate::impls::tokener::jwt::{SessionClaim, JWT};

/// Identity resolved from the opaque session token the auth provider
/// issued. Everything except `id` is display metadata.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

fn user_from_request(req: &HttpRequest) -> Result<Option<UserInfo>, actix_web::Error> {
    let header = match req.headers().get("Authorization") {
        None => return Ok(None),
        Some(h) => h,
    };
    let token = header.to_str().map_err(ErrorUnauthorized)?.trim_start_matches("Bearer ").to_owned();
    let jwt = req
        .app_data::<Data<JWT>>()
        .ok_or_else(|| ErrorUnauthorized("session verifier not configured"))?;
    let claim: SessionClaim = jwt.verify_token(&token).map_err(ErrorUnauthorized)?;
    Ok(Some(UserInfo {
        id: claim.sub,
        email: claim.email,
        name: claim.name,
        avatar_url: claim.avatar_url,
    }))
}

impl FromRequest for UserInfo {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;
    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(match user_from_request(req) {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(ErrorUnauthorized("no token in header")),
            Err(e) => Err(e),
        })
    }
}

/// Optional identity: most routes accept anonymous visitors.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<UserInfo>);

impl FromRequest for MaybeUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;
    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(user_from_request(req).map(MaybeUser))
    }
}

/// Per-device identity carried in the `X-Device-Id` header. Keys the
/// idempotency store; cooperative only, never an auth boundary.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub id: String,
}

impl FromRequest for DeviceInfo {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;
    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let header = match req.headers().get("X-Device-Id") {
            None => return ready(Err(ErrorBadRequest("missing X-Device-Id header"))),
            Some(h) => h,
        };
        ready(match header.to_str() {
            Err(e) => Err(ErrorBadRequest(e)),
            Ok(id) => {
                let ok = !id.is_empty()
                    && id.len() <= 64
                    && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
                if ok {
                    Ok(DeviceInfo { id: id.to_owned() })
                } else {
                    Err(ErrorBadRequest("malformed X-Device-Id header"))
                }
            }
        })
    }
}
