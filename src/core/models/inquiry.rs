use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Inquiry {
    pub id: Uuid,
    pub email: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct InquiryCreate {
    pub email: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub email: String,
    pub body: String,
}
