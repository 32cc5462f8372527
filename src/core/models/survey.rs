use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Surveys older than this are treated as ended even without a deadline.
pub const AUTO_EXPIRY_DAYS: i64 = 30;

/// The fixed category set creators pick from.
pub const CATEGORIES: &[&str] = &[
    "グルメ",
    "エンタメ",
    "ゲーム",
    "アニメ・漫画",
    "スポーツ",
    "音楽",
    "暮らし",
    "その他",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Limited,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Limited => "limited",
            Visibility::Private => "private",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Visibility::Public),
            "limited" => Some(Visibility::Limited),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Survey {
    pub id: Uuid,
    pub title: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub visibility: Visibility,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub owner_id: Option<String>,
    pub view_count: i32,
    pub likes_count: i32,
    pub image_url: Option<String>,
}

impl Survey {
    /// Ended means the deadline passed or the survey aged out entirely.
    pub fn is_ended(&self, now: DateTime<Utc>) -> bool {
        if let Some(deadline) = self.deadline {
            if deadline < now {
                return true;
            }
        }
        now - self.created_at > Duration::days(AUTO_EXPIRY_DAYS)
    }

    pub fn is_owned_by(&self, viewer_id: &str) -> bool {
        self.owner_id.as_deref() == Some(viewer_id)
    }
}

/// Survey plus the counts derived by joining options and comments.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedSurvey {
    #[serde(flatten)]
    pub survey: Survey,
    pub total_votes: i64,
    pub comment_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct SurveyCreate {
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_visibility")]
    pub visibility: Visibility,
    pub deadline: Option<DateTime<Utc>>,
    pub options: Vec<String>,
    pub image_url: Option<String>,
}

fn default_visibility() -> Visibility {
    Visibility::Public
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub title: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub visibility: String,
    pub deadline: Option<DateTime<Utc>>,
    pub owner_id: Option<String>,
    pub image_url: Option<String>,
}

/// Equality predicates for the row-fetch interface.
#[derive(Debug, Default)]
pub struct Query {
    pub visibility_eq: Option<String>,
    pub owner_id_eq: Option<String>,
}
