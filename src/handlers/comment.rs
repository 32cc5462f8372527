use actix_web::web::{Data, Json, Path};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::context::{DeviceInfo, MaybeUser};
use crate::core::models::comment::{Comment, CommentCreate};
use crate::core::services::comment::{apply_reaction, delete_comment, edit_comment, list_comments, post_comment};
use crate::database::sqlx::PgSqlx;
use crate::device::DeviceStore;
use crate::error::Error;
use crate::handlers::{enforce_cooldown, is_admin, now_ms};
use crate::response::{List, OkResponse};
use crate::AdminEmail;

pub async fn list(survey_id: Path<(Uuid,)>, db: Data<PgPool>) -> Result<Json<List<Comment>>, Error> {
    let mut storer = PgSqlx::new(db.acquire().await?);
    let comments = list_comments(&mut storer, survey_id.into_inner().0).await?;
    let total = comments.len() as i64;
    Ok(Json(List::new(comments, total)))
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    /// Returned exactly once; the device store keeps it from here on.
    pub owner_key: String,
}

pub async fn create(
    MaybeUser(user): MaybeUser,
    device: DeviceInfo,
    survey_id: Path<(Uuid,)>,
    body: Json<CommentCreate>,
    db: Data<PgPool>,
    devices: Data<DeviceStore>,
    admin: Data<AdminEmail>,
) -> Result<Json<PostResponse>, Error> {
    enforce_cooldown(&devices, &device.id, is_admin(&user, &admin))?;
    let mut storer = PgSqlx::new(db.acquire().await?);
    let (id, owner_key) = post_comment(&mut storer, survey_id.into_inner().0, body.into_inner()).await?;
    devices.record_comment_ownership(&device.id, id, &owner_key)?;
    devices.record_action(&device.id, now_ms())?;
    Ok(Json(PostResponse { id, owner_key }))
}

#[derive(Debug, Deserialize)]
pub struct EditBody {
    pub body: String,
}

pub async fn edit(
    MaybeUser(user): MaybeUser,
    device: DeviceInfo,
    comment_id: Path<(Uuid,)>,
    body: Json<EditBody>,
    db: Data<PgPool>,
    devices: Data<DeviceStore>,
    admin: Data<AdminEmail>,
) -> Result<Json<OkResponse>, Error> {
    let comment_id = comment_id.into_inner().0;
    let key = devices.owns_comment(&device.id, comment_id)?;
    let mut storer = PgSqlx::new(db.acquire().await?);
    edit_comment(&mut storer, comment_id, body.into_inner().body, key.as_deref(), is_admin(&user, &admin)).await?;
    Ok(Json(OkResponse::new()))
}

pub async fn delete(
    MaybeUser(user): MaybeUser,
    device: DeviceInfo,
    comment_id: Path<(Uuid,)>,
    db: Data<PgPool>,
    devices: Data<DeviceStore>,
    admin: Data<AdminEmail>,
) -> Result<Json<OkResponse>, Error> {
    let comment_id = comment_id.into_inner().0;
    let key = devices.owns_comment(&device.id, comment_id)?;
    let mut storer = PgSqlx::new(db.acquire().await?);
    delete_comment(&mut storer, comment_id, key.as_deref(), is_admin(&user, &admin)).await?;
    Ok(Json(OkResponse::new()))
}

#[derive(Debug, Deserialize)]
pub struct ReactionBody {
    pub kind: String,
}

#[derive(Debug, Serialize)]
pub struct ReactionResponse {
    pub active: bool,
}

pub async fn react(
    device: DeviceInfo,
    comment_id: Path<(Uuid,)>,
    body: Json<ReactionBody>,
    db: Data<PgPool>,
    devices: Data<DeviceStore>,
) -> Result<Json<ReactionResponse>, Error> {
    let comment_id = comment_id.into_inner().0;
    let kind = body.into_inner().kind;
    let active = devices.toggle_reaction(&device.id, comment_id, &kind)?;
    let mut storer = PgSqlx::new(db.acquire().await?);
    if let Err(e) = apply_reaction(&mut storer, comment_id, &kind, active).await {
        devices.toggle_reaction(&device.id, comment_id, &kind)?;
        return Err(e);
    }
    Ok(Json(ReactionResponse { active }))
}
