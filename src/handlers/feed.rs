use actix_web::web::{Bytes, Data, Json, Query};
use actix_web::HttpResponse;
use serde::Deserialize;
use sqlx::PgPool;
use tokio::sync::broadcast;

use crate::changefeed::{Change, FeedCache};
use crate::context::{DeviceInfo, MaybeUser};
use crate::core::models::feed::{FeedCriteria, FeedPage, PopularBy, Tab};
use crate::core::services::feed::select_feed;
use crate::database::sqlx::PgSqlx;
use crate::device::DeviceStore;
use crate::error::Error;

#[derive(Debug, Deserialize)]
pub struct FeedParams {
    #[serde(default)]
    pub tab: Tab,
    #[serde(default)]
    pub by: PopularBy,
    pub category: Option<String>,
    pub tag: Option<String>,
    #[serde(default)]
    pub q: String,
    pub page: Option<i64>,
}

pub async fn feed(
    MaybeUser(user): MaybeUser,
    device: DeviceInfo,
    Query(params): Query<FeedParams>,
    db: Data<PgPool>,
    cache: Data<FeedCache>,
    devices: Data<DeviceStore>,
) -> Result<Json<FeedPage>, Error> {
    let watched = if params.tab == Tab::Watching {
        devices.watched_set(&device.id)?
    } else {
        Default::default()
    };
    let criteria = FeedCriteria {
        tab: params.tab,
        popular_by: params.by,
        category: params.category.unwrap_or_else(|| "all".into()),
        tag: params.tag.filter(|t| !t.is_empty()),
        search_text: params.q,
        viewer_id: user.map(|u| u.id),
        watched,
        page: params.page.unwrap_or(1),
    };
    let mut storer = PgSqlx::new(db.acquire().await?);
    let snapshot = cache.snapshot(&mut storer).await?;
    Ok(Json(select_feed(&snapshot, &criteria, chrono::Utc::now())))
}

/// Server-sent change notifications. The payload only says which
/// table (and survey, when scoped) changed; clients re-fetch.
pub async fn changes(feed: Data<broadcast::Sender<Change>>) -> HttpResponse {
    let rx = feed.subscribe();
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(change) => {
                    let event = format!("data: {}\n\n", change.payload());
                    return Some((Ok::<_, actix_web::Error>(Bytes::from(event)), rx));
                }
                // dropped some events while lagging: the contract is
                // advisory anyway, keep streaming
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });
    HttpResponse::Ok().content_type("text/event-stream").streaming(stream)
}
