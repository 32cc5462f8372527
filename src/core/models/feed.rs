use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::survey::EnrichedSurvey;

/// Every feed page holds at most this many surveys.
pub const PAGE_SIZE: usize = 21;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    Latest,
    Popular,
    Watching,
    Ended,
    Mine,
}

impl Default for Tab {
    fn default() -> Self {
        Tab::Latest
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PopularBy {
    Trending,
    Score,
    Votes,
    Views,
}

impl Default for PopularBy {
    fn default() -> Self {
        PopularBy::Trending
    }
}

/// Everything the ranking engine needs to compose one feed view,
/// passed in as a plain value so the engine stays a pure function.
#[derive(Debug, Clone)]
pub struct FeedCriteria {
    pub tab: Tab,
    pub popular_by: PopularBy,
    /// Category label, or the `"all"` sentinel.
    pub category: String,
    pub tag: Option<String>,
    pub search_text: String,
    pub viewer_id: Option<String>,
    pub watched: HashSet<Uuid>,
    /// 1-based.
    pub page: i64,
}

impl Default for FeedCriteria {
    fn default() -> Self {
        Self {
            tab: Tab::default(),
            popular_by: PopularBy::default(),
            category: "all".into(),
            tag: None,
            search_text: String::new(),
            viewer_id: None,
            watched: HashSet::new(),
            page: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
    #[serde(flatten)]
    pub survey: EnrichedSurvey,
    /// 1..=3 on the popular tab, post-filter post-sort rank.
    pub rank_badge: Option<u8>,
}

#[derive(Debug, Serialize)]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    pub total_pages: i64,
    pub page: i64,
}
