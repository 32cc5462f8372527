use uuid::Uuid;

use crate::core::models::inquiry::{Insert as InquiryInsert, InquiryCreate};
use crate::core::ports::mailer::Mailer;
use crate::core::ports::repository::{InquiryCommon, Store};
use crate::core::services::validate::validate_inquiry;
use crate::error::Error;

/// Durable insert first, notification second. A failed send is logged
/// and swallowed: the record already exists, so the caller still gets
/// its confirmation.
pub async fn submit_inquiry<S, M>(storer: &mut S, mailer: &M, notify_to: &str, create: InquiryCreate) -> Result<Uuid, Error>
where
    S: Store,
    M: Mailer,
{
    validate_inquiry(&create)?;
    let id = InquiryCommon::insert(
        storer,
        InquiryInsert {
            email: create.email.trim().to_owned(),
            body: create.body.trim().to_owned(),
        },
    )
    .await?;
    let subject = format!("お問い合わせ ({})", id);
    let body = format!("from: {}\n\n{}", create.email.trim(), create.body.trim());
    if let Err(e) = mailer.send(notify_to, &subject, &body).await {
        log::warn!("inquiry {} saved but mail notification failed: {}", id, e);
    }
    Ok(id)
}
