use actix_web::web::{Data, Json, Path};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::context::{DeviceInfo, MaybeUser};
use crate::core::models::option::Opt;
use crate::core::models::survey::{Survey, SurveyCreate};
use crate::core::services::survey::{apply_like, cast_vote, count_view, create_survey, delete_survey, recorded_vote, survey_detail};
use crate::database::sqlx::PgSqlx;
use crate::device::DeviceStore;
use crate::error::Error;
use crate::handlers::{enforce_cooldown, is_admin, now_ms};
use crate::response::{CreateResponse, OkResponse};
use crate::AdminEmail;

pub async fn create(
    MaybeUser(user): MaybeUser,
    device: DeviceInfo,
    body: Json<SurveyCreate>,
    db: Data<PgPool>,
    devices: Data<DeviceStore>,
    admin: Data<AdminEmail>,
) -> Result<Json<CreateResponse<Uuid>>, Error> {
    enforce_cooldown(&devices, &device.id, is_admin(&user, &admin))?;
    let storer = PgSqlx::new(db.begin().await?);
    let id = create_survey(storer, user.map(|u| u.id), body.into_inner()).await?;
    devices.record_action(&device.id, now_ms())?;
    Ok(Json(CreateResponse::new(id)))
}

#[derive(Debug, Serialize)]
pub struct SurveyDetail {
    #[serde(flatten)]
    pub survey: Survey,
    pub options: Vec<Opt>,
    pub total_votes: i64,
    pub ended: bool,
    /// Which option this device already chose, if any; drives the
    /// result-view rendering client-side.
    pub voted_for: Option<String>,
    pub liked: bool,
    pub watched: bool,
}

pub async fn detail(
    MaybeUser(user): MaybeUser,
    device: DeviceInfo,
    survey_id: Path<(Uuid,)>,
    db: Data<PgPool>,
    devices: Data<DeviceStore>,
    admin: Data<AdminEmail>,
) -> Result<Json<SurveyDetail>, Error> {
    let survey_id = survey_id.into_inner().0;
    let admin = is_admin(&user, &admin);
    let mut storer = PgSqlx::new(db.acquire().await?);
    let (survey, options) = survey_detail(&mut storer, survey_id, user.as_ref().map(|u| u.id.as_str()), admin).await?;
    let total_votes = options.iter().map(|o| o.votes.max(0) as i64).sum();
    Ok(Json(SurveyDetail {
        ended: survey.is_ended(Utc::now()),
        voted_for: devices.has_voted(&device.id, survey_id)?,
        liked: devices.is_liked(&device.id, survey_id)?,
        watched: devices.is_watched(&device.id, survey_id)?,
        survey,
        options,
        total_votes,
    }))
}

pub async fn delete(
    MaybeUser(user): MaybeUser,
    survey_id: Path<(Uuid,)>,
    db: Data<PgPool>,
    admin: Data<AdminEmail>,
) -> Result<Json<OkResponse>, Error> {
    let admin = is_admin(&user, &admin);
    let storer = PgSqlx::new(db.begin().await?);
    delete_survey(storer, survey_id.into_inner().0, user.as_ref().map(|u| u.id.as_str()), admin).await?;
    Ok(Json(OkResponse::new()))
}

#[derive(Debug, Deserialize)]
pub struct VoteBody {
    pub option_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub option: Opt,
    pub voted_for: String,
}

/// One vote per survey per device; a repeated attempt is a no-op that
/// just reports the recorded choice.
pub async fn vote(
    device: DeviceInfo,
    survey_id: Path<(Uuid,)>,
    body: Json<VoteBody>,
    db: Data<PgPool>,
    devices: Data<DeviceStore>,
) -> Result<Json<VoteResponse>, Error> {
    let survey_id = survey_id.into_inner().0;
    let mut storer = PgSqlx::new(db.acquire().await?);
    if let Some(chosen) = devices.has_voted(&device.id, survey_id)? {
        let option = recorded_vote(&mut storer, survey_id, &chosen).await?;
        return Ok(Json(VoteResponse {
            option,
            voted_for: chosen,
        }));
    }
    let option = cast_vote(&mut storer, survey_id, body.option_id).await?;
    devices.record_vote(&device.id, survey_id, &option.name)?;
    Ok(Json(VoteResponse {
        voted_for: option.name.clone(),
        option,
    }))
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub active: bool,
}

pub async fn like(
    device: DeviceInfo,
    survey_id: Path<(Uuid,)>,
    db: Data<PgPool>,
    devices: Data<DeviceStore>,
) -> Result<Json<ToggleResponse>, Error> {
    let survey_id = survey_id.into_inner().0;
    let liked = devices.toggle_like(&device.id, survey_id)?;
    let mut storer = PgSqlx::new(db.acquire().await?);
    if let Err(e) = apply_like(&mut storer, survey_id, liked).await {
        // roll the optimistic toggle back rather than dangle
        devices.toggle_like(&device.id, survey_id)?;
        return Err(e);
    }
    Ok(Json(ToggleResponse { active: liked }))
}

/// Watching is device-local only; nothing to persist remotely.
pub async fn watch(
    device: DeviceInfo,
    survey_id: Path<(Uuid,)>,
    devices: Data<DeviceStore>,
) -> Result<Json<ToggleResponse>, Error> {
    let active = devices.toggle_watch(&device.id, survey_id.into_inner().0)?;
    Ok(Json(ToggleResponse { active }))
}

/// Debounced per device and survey; inside the window the call is an
/// accepted no-op.
pub async fn view(
    device: DeviceInfo,
    survey_id: Path<(Uuid,)>,
    db: Data<PgPool>,
    devices: Data<DeviceStore>,
) -> Result<Json<OkResponse>, Error> {
    let survey_id = survey_id.into_inner().0;
    if devices.should_count_view(&device.id, survey_id, now_ms())? {
        let mut storer = PgSqlx::new(db.acquire().await?);
        if let Err(e) = count_view(&mut storer, survey_id).await {
            // re-arm the window so the view is not silently lost
            devices.forget_view(&device.id, survey_id)?;
            return Err(e);
        }
    }
    Ok(Json(OkResponse::new()))
}
