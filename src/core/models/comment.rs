use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Soft delete is a state, not a magic sentinel: the row, its
/// reactions and its timestamps all survive deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "text", rename_all = "lowercase")]
pub enum CommentBody {
    Active(String),
    Deleted,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub author: String,
    pub body: CommentBody,
    pub reactions: BTreeMap<String, i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CommentCreate {
    #[serde(default)]
    pub author: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub survey_id: Uuid,
    pub author: String,
    pub body: String,
    /// sha256 of the ownership key; the key itself never hits the store.
    pub owner_key_hash: String,
}

#[derive(Debug, Default)]
pub struct Query {
    pub survey_id_eq: Option<Uuid>,
}
