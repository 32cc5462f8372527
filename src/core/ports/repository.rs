use uuid::Uuid;

use crate::core::models::{
    comment::{Comment, Insert as CommentInsert, Query as CommentQuery},
    inquiry::{Inquiry, Insert as InquiryInsert},
    option::{Insert as OptionInsert, Opt, Query as OptionQuery},
    survey::{Insert as SurveyInsert, Query as SurveyQuery, Survey},
};
use crate::error::Error;

pub trait SurveyCommon {
    async fn insert(&mut self, data: SurveyInsert) -> Result<Uuid, Error>;
    async fn query(&mut self, query: &SurveyQuery) -> Result<Vec<Survey>, Error>;
    async fn get(&mut self, id: Uuid) -> Result<Survey, Error>;
    async fn delete(&mut self, id: Uuid) -> Result<(), Error>;
    /// Atomic likes_count adjustment, clamped at zero server-side.
    async fn add_likes(&mut self, id: Uuid, delta: i32) -> Result<(), Error>;
    /// The atomic view-count increment procedure.
    async fn bump_view_count(&mut self, id: Uuid) -> Result<(), Error>;
}

pub trait OptionCommon {
    async fn insert(&mut self, option: OptionInsert) -> Result<Uuid, Error>;
    async fn query(&mut self, query: &OptionQuery) -> Result<Vec<Opt>, Error>;
    async fn get(&mut self, id: Uuid) -> Result<Opt, Error>;
    /// The one permitted mutation: increment by exactly one.
    async fn add_vote(&mut self, id: Uuid) -> Result<i32, Error>;
    async fn delete_by_survey(&mut self, survey_id: Uuid) -> Result<(), Error>;
}

pub trait CommentCommon {
    async fn insert(&mut self, comment: CommentInsert) -> Result<Uuid, Error>;
    async fn query(&mut self, query: &CommentQuery) -> Result<Vec<Comment>, Error>;
    async fn get(&mut self, id: Uuid) -> Result<Comment, Error>;
    async fn owner_key_hash(&mut self, id: Uuid) -> Result<String, Error>;
    async fn update_body(&mut self, id: Uuid, body: String) -> Result<(), Error>;
    async fn mark_deleted(&mut self, id: Uuid) -> Result<(), Error>;
    /// Adjusts one reaction kind by delta, dropping counts below zero.
    async fn adjust_reaction(&mut self, id: Uuid, kind: &str, delta: i64) -> Result<(), Error>;
    async fn delete_by_survey(&mut self, survey_id: Uuid) -> Result<(), Error>;
}

pub trait InquiryCommon {
    async fn insert(&mut self, inquiry: InquiryInsert) -> Result<Uuid, Error>;
    async fn query(&mut self) -> Result<Vec<Inquiry>, Error>;
}

pub trait Common: SurveyCommon + OptionCommon + CommentCommon + InquiryCommon {}

pub trait Store: Common {}

pub trait TxStore: Store {
    async fn commit(self) -> Result<(), Error>;
    async fn rollback(self) -> Result<(), Error>;
}
