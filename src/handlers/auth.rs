use actix_web::web::{Data, Json};
use serde::Serialize;

use crate::context::UserInfo;
use crate::error::Error;
use crate::AdminEmail;

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub user: UserInfo,
    pub is_admin: bool,
}

/// Resolves the opaque session token into the identity the UI needs.
pub async fn session(user: UserInfo, admin: Data<AdminEmail>) -> Result<Json<SessionResponse>, Error> {
    let is_admin = user.email == admin.0;
    Ok(Json(SessionResponse { user, is_admin }))
}
