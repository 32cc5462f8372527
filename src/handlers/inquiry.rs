use actix_web::web::{Data, Json};
use sqlx::PgPool;
use uuid::Uuid;

use crate::context::{DeviceInfo, MaybeUser, UserInfo};
use crate::core::models::inquiry::{Inquiry, InquiryCreate};
use crate::core::ports::repository::InquiryCommon;
use crate::core::services::inquiry::submit_inquiry;
use crate::database::sqlx::PgSqlx;
use crate::device::DeviceStore;
use crate::error::Error;
use crate::handlers::{enforce_cooldown, is_admin, now_ms};
use crate::impls::mailer::smtp::SmtpMailer;
use crate::response::{CreateResponse, List};
use crate::{AdminEmail, InquiryInbox};

pub async fn create(
    MaybeUser(user): MaybeUser,
    device: DeviceInfo,
    body: Json<InquiryCreate>,
    db: Data<PgPool>,
    devices: Data<DeviceStore>,
    mailer: Data<SmtpMailer>,
    inbox: Data<InquiryInbox>,
    admin: Data<AdminEmail>,
) -> Result<Json<CreateResponse<Uuid>>, Error> {
    enforce_cooldown(&devices, &device.id, is_admin(&user, &admin))?;
    let mut storer = PgSqlx::new(db.acquire().await?);
    let id = submit_inquiry(&mut storer, mailer.get_ref(), &inbox.0, body.into_inner()).await?;
    devices.record_action(&device.id, now_ms())?;
    Ok(Json(CreateResponse::new(id)))
}

pub async fn list(user: UserInfo, db: Data<PgPool>, admin: Data<AdminEmail>) -> Result<Json<List<Inquiry>>, Error> {
    if !is_admin(&Some(user), &admin) {
        return Err(Error::Unauthorized);
    }
    let mut storer = PgSqlx::new(db.acquire().await?);
    let inquiries = InquiryCommon::query(&mut storer).await?;
    let total = inquiries.len() as i64;
    Ok(Json(List::new(inquiries, total)))
}
