use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::core::models::comment::Query as CommentQuery;
use crate::core::models::option::Query as OptionQuery;
use crate::core::models::survey::{EnrichedSurvey, Query as SurveyQuery};
use crate::core::ports::repository::{CommentCommon, OptionCommon, Store, SurveyCommon};
use crate::core::services::aggregate::aggregate;
use crate::database::sqlx::CHANGE_CHANNEL;
use crate::error::Error;

/// One row-change notification. The payload is advisory: subscribers
/// re-fetch, they never patch from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Surveys,
    Options(Option<Uuid>),
    Comments(Option<Uuid>),
}

impl Change {
    pub fn payload(&self) -> String {
        match self {
            Change::Surveys => "surveys".into(),
            Change::Options(None) => "options".into(),
            Change::Options(Some(id)) => format!("options:{}", id),
            Change::Comments(None) => "comments".into(),
            Change::Comments(Some(id)) => format!("comments:{}", id),
        }
    }
}

pub fn parse_change(payload: &str) -> Option<Change> {
    let (table, survey_id) = match payload.split_once(':') {
        Some((table, id)) => (table, Uuid::parse_str(id).ok()),
        None => (payload, None),
    };
    match table {
        "surveys" => Some(Change::Surveys),
        "options" => Some(Change::Options(survey_id)),
        "comments" => Some(Change::Comments(survey_id)),
        _ => None,
    }
}

/// Cached enriched survey set with invalidate-and-recompute coherence.
/// The sequence counter is the monotonic refresh token: a refresh that
/// raced a newer invalidation is served but never cached.
pub struct FeedCache {
    seq: AtomicU64,
    snapshot: RwLock<Option<(u64, Arc<Vec<EnrichedSurvey>>)>>,
}

impl FeedCache {
    pub fn new() -> Self {
        Self {
            seq: AtomicU64::new(0),
            snapshot: RwLock::new(None),
        }
    }

    pub fn invalidate(&self) {
        self.seq.fetch_add(1, Ordering::SeqCst);
    }

    pub async fn snapshot<S>(&self, storer: &mut S) -> Result<Arc<Vec<EnrichedSurvey>>, Error>
    where
        S: Store,
    {
        let seq = self.seq.load(Ordering::SeqCst);
        {
            let guard = self.snapshot.read().await;
            if let Some((cached_seq, data)) = &*guard {
                if *cached_seq == seq {
                    return Ok(data.clone());
                }
            }
        }
        let surveys = SurveyCommon::query(storer, &SurveyQuery::default()).await?;
        // child fetch failures degrade to zero-filled counts instead
        // of taking the whole feed down
        let options = match OptionCommon::query(storer, &OptionQuery::default()).await {
            Ok(options) => options,
            Err(e) => {
                log::warn!("options fetch failed, feed degrades to zero votes: {}", e);
                vec![]
            }
        };
        let comments = match CommentCommon::query(storer, &CommentQuery::default()).await {
            Ok(comments) => comments,
            Err(e) => {
                log::warn!("comments fetch failed, feed degrades to zero comments: {}", e);
                vec![]
            }
        };
        let enriched = Arc::new(aggregate(surveys, &options, &comments));
        let mut guard = self.snapshot.write().await;
        if self.seq.load(Ordering::SeqCst) == seq {
            *guard = Some((seq, enriched.clone()));
        }
        Ok(enriched)
    }
}

/// LISTENs on the change channel, invalidating the feed cache and
/// fanning the event out to any subscribed streams. Runs for the life
/// of the process; the listener reconnects internally on recv errors.
pub async fn run_listener(pool: PgPool, cache: Arc<FeedCache>, tx: broadcast::Sender<Change>) -> Result<(), Error> {
    let mut listener = PgListener::connect_with(&pool).await?;
    listener.listen(CHANGE_CHANNEL).await?;
    log::info!("change feed listening on {}", CHANGE_CHANNEL);
    loop {
        match listener.recv().await {
            Ok(notification) => {
                if let Some(change) = parse_change(notification.payload()) {
                    cache.invalidate();
                    // no receivers is fine, feeds may have no watchers
                    let _ = tx.send(change);
                }
            }
            Err(e) => {
                log::warn!("change feed recv error: {}", e);
                // do not spin while the connection is down
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            }
        }
    }
}
