use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::core::models::comment::{Comment, CommentBody};
use crate::core::models::option::Opt;
use crate::core::models::survey::{Survey, Visibility};

#[derive(Debug, FromRow)]
pub struct SurveyRow {
    pub id: Uuid,
    pub title: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub visibility: String,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub owner_id: Option<String>,
    pub view_count: i32,
    pub likes_count: i32,
    pub image_url: Option<String>,
}

impl From<SurveyRow> for Survey {
    fn from(row: SurveyRow) -> Self {
        Survey {
            id: row.id,
            title: row.title,
            category: row.category,
            tags: row.tags,
            // rows with an unrecognized marker stay hidden
            visibility: Visibility::from_str(&row.visibility).unwrap_or(Visibility::Private),
            deadline: row.deadline,
            created_at: row.created_at,
            owner_id: row.owner_id,
            view_count: row.view_count,
            likes_count: row.likes_count,
            image_url: row.image_url,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct OptionRow {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub name: String,
    pub votes: i32,
}

impl From<OptionRow> for Opt {
    fn from(row: OptionRow) -> Self {
        Opt {
            id: row.id,
            survey_id: row.survey_id,
            name: row.name,
            votes: row.votes,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct CommentRow {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub author: String,
    pub content: String,
    pub deleted: bool,
    pub reactions: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        let reactions: BTreeMap<String, i64> = serde_json::from_value(row.reactions).unwrap_or_default();
        Comment {
            id: row.id,
            survey_id: row.survey_id,
            author: row.author,
            body: if row.deleted {
                CommentBody::Deleted
            } else {
                CommentBody::Active(row.content)
            },
            reactions,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
