use chrono::Utc;
use uuid::Uuid;

use crate::core::models::{
    option::{Insert as OptionInsert, Opt, Query as OptionQuery},
    survey::{Insert as SurveyInsert, Survey, SurveyCreate, Visibility},
};
use crate::core::ports::repository::{CommentCommon, OptionCommon, Store, SurveyCommon, TxStore};
use crate::core::services::validate::validate_survey;
use crate::error::Error;

/// Inserts the survey and its option batch in one transaction.
pub async fn create_survey<T>(mut storer: T, owner_id: Option<String>, create: SurveyCreate) -> Result<Uuid, Error>
where
    T: TxStore,
{
    validate_survey(&create)?;
    let survey_id = SurveyCommon::insert(
        &mut storer,
        SurveyInsert {
            title: create.title.trim().to_owned(),
            category: Some(create.category),
            tags: create.tags,
            visibility: create.visibility.as_str().to_owned(),
            deadline: create.deadline,
            owner_id,
            image_url: create.image_url,
        },
    )
    .await?;
    for name in create.options {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        OptionCommon::insert(
            &mut storer,
            OptionInsert {
                survey_id,
                name: name.to_owned(),
            },
        )
        .await?;
    }
    storer.commit().await?;
    Ok(survey_id)
}

/// Owner or administrator only. Options and comments go with the
/// parent; soft-delete state only matters while the survey lives.
pub async fn delete_survey<T>(mut storer: T, survey_id: Uuid, viewer_id: Option<&str>, is_admin: bool) -> Result<(), Error>
where
    T: TxStore,
{
    let survey = SurveyCommon::get(&mut storer, survey_id).await?;
    let owned = viewer_id.map(|v| survey.is_owned_by(v)).unwrap_or(false);
    if !owned && !is_admin {
        return Err(Error::Unauthorized);
    }
    OptionCommon::delete_by_survey(&mut storer, survey_id).await?;
    CommentCommon::delete_by_survey(&mut storer, survey_id).await?;
    SurveyCommon::delete(&mut storer, survey_id).await?;
    storer.commit().await?;
    Ok(())
}

/// Accepts one vote: the survey must still be open, the option must
/// belong to it, and the increment is atomic in the store. The caller
/// is responsible for having checked the device's vote marker first
/// and for recording it afterwards.
pub async fn cast_vote<S>(storer: &mut S, survey_id: Uuid, option_id: Uuid) -> Result<Opt, Error>
where
    S: Store,
{
    let survey = SurveyCommon::get(storer, survey_id).await?;
    if survey.is_ended(Utc::now()) {
        return Err(Error::Validation("このアンケートは終了しました".into()));
    }
    let option = OptionCommon::get(storer, option_id).await?;
    if option.survey_id != survey_id {
        return Err(Error::Validation("選択肢がアンケートに属していません".into()));
    }
    let votes = OptionCommon::add_vote(storer, option_id).await?;
    Ok(Opt { votes, ..option })
}

/// Resolves the option a device already chose, scoped to the survey it
/// voted on; the caller's option id is ignored so a repeat request can
/// never echo a foreign option.
pub async fn recorded_vote<S>(storer: &mut S, survey_id: Uuid, chosen: &str) -> Result<Opt, Error>
where
    S: Store,
{
    let options = OptionCommon::query(
        storer,
        &OptionQuery {
            survey_id_eq: Some(survey_id),
        },
    )
    .await?;
    options
        .into_iter()
        .find(|o| o.name == chosen)
        .ok_or_else(|| Error::Validation("投票済みの選択肢が見つかりません".into()))
}

/// `liked` is the device-local toggle outcome; the counter follows it.
pub async fn apply_like<S>(storer: &mut S, survey_id: Uuid, liked: bool) -> Result<(), Error>
where
    S: Store,
{
    SurveyCommon::add_likes(storer, survey_id, if liked { 1 } else { -1 }).await
}

pub async fn count_view<S>(storer: &mut S, survey_id: Uuid) -> Result<(), Error>
where
    S: Store,
{
    SurveyCommon::bump_view_count(storer, survey_id).await
}

/// Fetches one survey, enforcing visibility: private surveys are the
/// owner's (or an admin's) alone, limited ones resolve by direct link.
pub async fn survey_detail<S>(storer: &mut S, survey_id: Uuid, viewer_id: Option<&str>, is_admin: bool) -> Result<(Survey, Vec<Opt>), Error>
where
    S: Store,
{
    let survey = SurveyCommon::get(storer, survey_id).await?;
    if survey.visibility == Visibility::Private {
        let owned = viewer_id.map(|v| survey.is_owned_by(v)).unwrap_or(false);
        if !owned && !is_admin {
            return Err(Error::Unauthorized);
        }
    }
    let options = OptionCommon::query(
        storer,
        &OptionQuery {
            survey_id_eq: Some(survey_id),
        },
    )
    .await?;
    Ok((survey, options))
}

#[cfg(test)]
mod test {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::core::models::comment::{Comment, Insert as CommentInsert, Query as CommentQuery};
    use crate::core::models::inquiry::{Inquiry, Insert as InquiryInsert};
    use crate::core::models::survey::Query as SurveyQuery;
    use crate::core::ports::repository::{Common, InquiryCommon};

    #[derive(Default)]
    struct MemStore {
        surveys: Vec<Survey>,
        options: Vec<Opt>,
        fail_view_counts: bool,
    }

    impl MemStore {
        fn survey(&mut self, deadline_in: Option<Duration>) -> Uuid {
            let id = Uuid::new_v4();
            self.surveys.push(Survey {
                id,
                title: "t".into(),
                category: None,
                tags: vec![],
                visibility: Visibility::Public,
                deadline: deadline_in.map(|d| Utc::now() + d),
                created_at: Utc::now(),
                owner_id: None,
                view_count: 0,
                likes_count: 0,
                image_url: None,
            });
            id
        }

        fn option(&mut self, survey_id: Uuid, name: &str) -> Uuid {
            let id = Uuid::new_v4();
            self.options.push(Opt {
                id,
                survey_id,
                name: name.into(),
                votes: 0,
            });
            id
        }
    }

    impl SurveyCommon for MemStore {
        async fn insert(&mut self, _data: SurveyInsert) -> Result<Uuid, Error> {
            Ok(Uuid::new_v4())
        }

        async fn query(&mut self, _query: &SurveyQuery) -> Result<Vec<Survey>, Error> {
            Ok(self.surveys.clone())
        }

        async fn get(&mut self, id: Uuid) -> Result<Survey, Error> {
            self.surveys
                .iter()
                .find(|s| s.id == id)
                .cloned()
                .ok_or(Error::Database(sqlx::Error::RowNotFound))
        }

        async fn delete(&mut self, id: Uuid) -> Result<(), Error> {
            self.surveys.retain(|s| s.id != id);
            Ok(())
        }

        async fn add_likes(&mut self, _id: Uuid, _delta: i32) -> Result<(), Error> {
            Ok(())
        }

        async fn bump_view_count(&mut self, id: Uuid) -> Result<(), Error> {
            if self.fail_view_counts {
                return Err(Error::Database(sqlx::Error::PoolClosed));
            }
            if let Some(s) = self.surveys.iter_mut().find(|s| s.id == id) {
                s.view_count += 1;
            }
            Ok(())
        }
    }

    impl OptionCommon for MemStore {
        async fn insert(&mut self, option: OptionInsert) -> Result<Uuid, Error> {
            Ok(self.option(option.survey_id, &option.name))
        }

        async fn query(&mut self, param: &OptionQuery) -> Result<Vec<Opt>, Error> {
            Ok(self
                .options
                .iter()
                .filter(|o| param.survey_id_eq.map(|s| o.survey_id == s).unwrap_or(true))
                .cloned()
                .collect())
        }

        async fn get(&mut self, id: Uuid) -> Result<Opt, Error> {
            self.options
                .iter()
                .find(|o| o.id == id)
                .cloned()
                .ok_or(Error::Database(sqlx::Error::RowNotFound))
        }

        async fn add_vote(&mut self, id: Uuid) -> Result<i32, Error> {
            let option = self
                .options
                .iter_mut()
                .find(|o| o.id == id)
                .ok_or(Error::Database(sqlx::Error::RowNotFound))?;
            option.votes += 1;
            Ok(option.votes)
        }

        async fn delete_by_survey(&mut self, survey_id: Uuid) -> Result<(), Error> {
            self.options.retain(|o| o.survey_id != survey_id);
            Ok(())
        }
    }

    impl CommentCommon for MemStore {
        async fn insert(&mut self, _comment: CommentInsert) -> Result<Uuid, Error> {
            Ok(Uuid::new_v4())
        }

        async fn query(&mut self, _param: &CommentQuery) -> Result<Vec<Comment>, Error> {
            Ok(vec![])
        }

        async fn get(&mut self, _id: Uuid) -> Result<Comment, Error> {
            Err(Error::Database(sqlx::Error::RowNotFound))
        }

        async fn owner_key_hash(&mut self, _id: Uuid) -> Result<String, Error> {
            Err(Error::Database(sqlx::Error::RowNotFound))
        }

        async fn update_body(&mut self, _id: Uuid, _body: String) -> Result<(), Error> {
            Ok(())
        }

        async fn mark_deleted(&mut self, _id: Uuid) -> Result<(), Error> {
            Ok(())
        }

        async fn adjust_reaction(&mut self, _id: Uuid, _kind: &str, _delta: i64) -> Result<(), Error> {
            Ok(())
        }

        async fn delete_by_survey(&mut self, _survey_id: Uuid) -> Result<(), Error> {
            Ok(())
        }
    }

    impl InquiryCommon for MemStore {
        async fn insert(&mut self, _inquiry: InquiryInsert) -> Result<Uuid, Error> {
            Ok(Uuid::new_v4())
        }

        async fn query(&mut self) -> Result<Vec<Inquiry>, Error> {
            Ok(vec![])
        }
    }

    impl Common for MemStore {}
    impl Store for MemStore {}

    #[tokio::test]
    async fn test_recorded_vote_resolves_within_survey() {
        let mut store = MemStore::default();
        let s1 = store.survey(Some(Duration::hours(1)));
        let s2 = store.survey(Some(Duration::hours(1)));
        store.option(s1, "A");
        let s1_b = store.option(s1, "B");
        // same name on another survey must never be echoed back
        store.option(s2, "B");
        let option = recorded_vote(&mut store, s1, "B").await.unwrap();
        assert_eq!(option.id, s1_b);
        assert_eq!(option.survey_id, s1);
    }

    #[tokio::test]
    async fn test_recorded_vote_unknown_name_rejected() {
        let mut store = MemStore::default();
        let s1 = store.survey(None);
        store.option(s1, "A");
        assert!(recorded_vote(&mut store, s1, "Z").await.is_err());
    }

    #[tokio::test]
    async fn test_vote_rejected_for_foreign_option() {
        let mut store = MemStore::default();
        let s1 = store.survey(Some(Duration::hours(1)));
        let s2 = store.survey(Some(Duration::hours(1)));
        let foreign = store.option(s2, "A");
        store.option(s1, "A");
        assert!(cast_vote(&mut store, s1, foreign).await.is_err());
    }

    #[tokio::test]
    async fn test_vote_rejected_after_deadline() {
        let mut store = MemStore::default();
        let s1 = store.survey(Some(Duration::hours(-1)));
        let option = store.option(s1, "A");
        assert!(cast_vote(&mut store, s1, option).await.is_err());
    }

    #[tokio::test]
    async fn test_accepted_vote_increments() {
        let mut store = MemStore::default();
        let s1 = store.survey(Some(Duration::hours(1)));
        let option = store.option(s1, "A");
        let voted = cast_vote(&mut store, s1, option).await.unwrap();
        assert_eq!(voted.votes, 1);
        assert_eq!(voted.name, "A");
    }

    #[tokio::test]
    async fn test_failed_view_count_surfaces_error() {
        let mut store = MemStore::default();
        let s1 = store.survey(None);
        store.fail_view_counts = true;
        assert!(count_view(&mut store, s1).await.is_err());
    }
}
