use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Opt {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub name: String,
    pub votes: i32,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub survey_id: Uuid,
    pub name: String,
}

#[derive(Debug, Default)]
pub struct Query {
    pub survey_id_eq: Option<Uuid>,
}
