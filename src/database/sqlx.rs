use sqlx::pool::PoolConnection;
use sqlx::{query, query_as, query_scalar, Executor, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::core::models::{
    comment::{Comment, Insert as CommentInsert, Query as CommentQuery},
    inquiry::{Inquiry, Insert as InquiryInsert},
    option::{Insert as OptionInsert, Opt, Query as OptionQuery},
    survey::{Insert as SurveyInsert, Query as SurveyQuery, Survey},
};
use crate::core::ports::repository::{CommentCommon, Common, InquiryCommon, OptionCommon, Store, SurveyCommon, TxStore};
use crate::database::models::{CommentRow, OptionRow, SurveyRow};
use crate::error::Error;

/// NOTIFY channel mirrored by the change feed listener.
pub const CHANGE_CHANNEL: &str = "plaza_changes";

pub struct PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    executor: E,
}

impl<E> PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Every mutation advertises itself so subscribed feeds re-fetch.
    async fn notify(&mut self, table: &str, survey_id: Option<Uuid>) -> Result<(), Error> {
        let payload = match survey_id {
            Some(id) => format!("{}:{}", table, id),
            None => table.to_owned(),
        };
        query("SELECT pg_notify($1, $2)")
            .bind(CHANGE_CHANNEL)
            .bind(payload)
            .execute(&mut self.executor)
            .await?;
        Ok(())
    }
}

impl<E> SurveyCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, data: SurveyInsert) -> Result<Uuid, Error> {
        let id = query_scalar(
            "INSERT INTO surveys (title, category, tags, visibility, deadline, owner_id, image_url)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id",
        )
        .bind(data.title)
        .bind(data.category)
        .bind(data.tags)
        .bind(data.visibility)
        .bind(data.deadline)
        .bind(data.owner_id)
        .bind(data.image_url)
        .fetch_one(&mut self.executor)
        .await?;
        self.notify("surveys", None).await?;
        Ok(id)
    }

    async fn query(&mut self, param: &SurveyQuery) -> Result<Vec<Survey>, Error> {
        let mut q = QueryBuilder::new("SELECT * FROM surveys WHERE 1 = 1");
        if let Some(visibility) = &param.visibility_eq {
            q.push(" AND visibility = ").push_bind(visibility);
        }
        if let Some(owner_id) = &param.owner_id_eq {
            q.push(" AND owner_id = ").push_bind(owner_id);
        }
        q.push(" ORDER BY created_at DESC");
        let rows: Vec<SurveyRow> = q.build_query_as().fetch_all(&mut self.executor).await?;
        Ok(rows.into_iter().map(Survey::from).collect())
    }

    async fn get(&mut self, id: Uuid) -> Result<Survey, Error> {
        let row: SurveyRow = query_as("SELECT * FROM surveys WHERE id = $1")
            .bind(id)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(row.into())
    }

    async fn delete(&mut self, id: Uuid) -> Result<(), Error> {
        query("DELETE FROM surveys WHERE id = $1").bind(id).execute(&mut self.executor).await?;
        self.notify("surveys", None).await?;
        Ok(())
    }

    async fn add_likes(&mut self, id: Uuid, delta: i32) -> Result<(), Error> {
        query("UPDATE surveys SET likes_count = GREATEST(likes_count + $2, 0) WHERE id = $1")
            .bind(id)
            .bind(delta)
            .execute(&mut self.executor)
            .await?;
        self.notify("surveys", Some(id)).await?;
        Ok(())
    }

    async fn bump_view_count(&mut self, id: Uuid) -> Result<(), Error> {
        query("UPDATE surveys SET view_count = view_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&mut self.executor)
            .await?;
        self.notify("surveys", Some(id)).await?;
        Ok(())
    }
}

impl<E> OptionCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, option: OptionInsert) -> Result<Uuid, Error> {
        let id = query_scalar("INSERT INTO options (survey_id, name, votes) VALUES ($1, $2, 0) RETURNING id")
            .bind(option.survey_id)
            .bind(option.name)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(id)
    }

    async fn query(&mut self, param: &OptionQuery) -> Result<Vec<Opt>, Error> {
        let mut q = QueryBuilder::new("SELECT * FROM options WHERE 1 = 1");
        if let Some(survey_id) = param.survey_id_eq {
            q.push(" AND survey_id = ").push_bind(survey_id);
        }
        q.push(" ORDER BY ord");
        let rows: Vec<OptionRow> = q.build_query_as().fetch_all(&mut self.executor).await?;
        Ok(rows.into_iter().map(Opt::from).collect())
    }

    async fn get(&mut self, id: Uuid) -> Result<Opt, Error> {
        let row: OptionRow = query_as("SELECT * FROM options WHERE id = $1")
            .bind(id)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(row.into())
    }

    async fn add_vote(&mut self, id: Uuid) -> Result<i32, Error> {
        let (survey_id, votes): (Uuid, i32) =
            query_as("UPDATE options SET votes = votes + 1 WHERE id = $1 RETURNING survey_id, votes")
                .bind(id)
                .fetch_one(&mut self.executor)
                .await?;
        self.notify("options", Some(survey_id)).await?;
        Ok(votes)
    }

    async fn delete_by_survey(&mut self, survey_id: Uuid) -> Result<(), Error> {
        query("DELETE FROM options WHERE survey_id = $1")
            .bind(survey_id)
            .execute(&mut self.executor)
            .await?;
        Ok(())
    }
}

impl<E> CommentCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, comment: CommentInsert) -> Result<Uuid, Error> {
        let id = query_scalar(
            "INSERT INTO comments (survey_id, author, content, owner_key_hash, reactions, deleted)
             VALUES ($1, $2, $3, $4, '{}'::jsonb, FALSE)
             RETURNING id",
        )
        .bind(comment.survey_id)
        .bind(comment.author)
        .bind(comment.body)
        .bind(comment.owner_key_hash)
        .fetch_one(&mut self.executor)
        .await?;
        self.notify("comments", Some(comment.survey_id)).await?;
        Ok(id)
    }

    async fn query(&mut self, param: &CommentQuery) -> Result<Vec<Comment>, Error> {
        let mut q = QueryBuilder::new("SELECT * FROM comments WHERE 1 = 1");
        if let Some(survey_id) = param.survey_id_eq {
            q.push(" AND survey_id = ").push_bind(survey_id);
        }
        q.push(" ORDER BY created_at");
        let rows: Vec<CommentRow> = q.build_query_as().fetch_all(&mut self.executor).await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn get(&mut self, id: Uuid) -> Result<Comment, Error> {
        let row: CommentRow = query_as("SELECT * FROM comments WHERE id = $1")
            .bind(id)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(row.into())
    }

    async fn owner_key_hash(&mut self, id: Uuid) -> Result<String, Error> {
        let hash = query_scalar("SELECT owner_key_hash FROM comments WHERE id = $1")
            .bind(id)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(hash)
    }

    async fn update_body(&mut self, id: Uuid, body: String) -> Result<(), Error> {
        let (survey_id,): (Uuid,) =
            query_as("UPDATE comments SET content = $2, updated_at = NOW() WHERE id = $1 AND NOT deleted RETURNING survey_id")
                .bind(id)
                .bind(body)
                .fetch_one(&mut self.executor)
                .await?;
        self.notify("comments", Some(survey_id)).await?;
        Ok(())
    }

    async fn mark_deleted(&mut self, id: Uuid) -> Result<(), Error> {
        // logical delete: content is blanked, the row and its
        // reactions and timestamps stay
        let (survey_id,): (Uuid,) =
            query_as("UPDATE comments SET deleted = TRUE, content = '', updated_at = NOW() WHERE id = $1 RETURNING survey_id")
                .bind(id)
                .fetch_one(&mut self.executor)
                .await?;
        self.notify("comments", Some(survey_id)).await?;
        Ok(())
    }

    async fn adjust_reaction(&mut self, id: Uuid, kind: &str, delta: i64) -> Result<(), Error> {
        let (survey_id,): (Uuid,) = query_as(
            "UPDATE comments SET reactions =
               CASE WHEN GREATEST(COALESCE((reactions->>$2)::bigint, 0) + $3, 0) = 0
                    THEN reactions - $2
                    ELSE jsonb_set(COALESCE(reactions, '{}'::jsonb), ARRAY[$2],
                                   to_jsonb(GREATEST(COALESCE((reactions->>$2)::bigint, 0) + $3, 0)))
               END
             WHERE id = $1
             RETURNING survey_id",
        )
        .bind(id)
        .bind(kind)
        .bind(delta)
        .fetch_one(&mut self.executor)
        .await?;
        self.notify("comments", Some(survey_id)).await?;
        Ok(())
    }

    async fn delete_by_survey(&mut self, survey_id: Uuid) -> Result<(), Error> {
        query("DELETE FROM comments WHERE survey_id = $1")
            .bind(survey_id)
            .execute(&mut self.executor)
            .await?;
        Ok(())
    }
}

impl<E> InquiryCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, inquiry: InquiryInsert) -> Result<Uuid, Error> {
        let id = query_scalar("INSERT INTO inquiries (email, body) VALUES ($1, $2) RETURNING id")
            .bind(inquiry.email)
            .bind(inquiry.body)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(id)
    }

    async fn query(&mut self) -> Result<Vec<Inquiry>, Error> {
        let rows: Vec<(Uuid, String, String, chrono::DateTime<chrono::Utc>)> =
            query_as("SELECT id, email, body, created_at FROM inquiries ORDER BY created_at DESC")
                .fetch_all(&mut self.executor)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(id, email, body, created_at)| Inquiry { id, email, body, created_at })
            .collect())
    }
}

impl Common for PgSqlx<PoolConnection<Postgres>> {}
impl<'a> Common for PgSqlx<Transaction<'a, Postgres>> {}
impl Store for PgSqlx<PoolConnection<Postgres>> {}
impl<'a> Store for PgSqlx<Transaction<'a, Postgres>> {}

impl<'a> TxStore for PgSqlx<Transaction<'a, Postgres>> {
    async fn commit(self) -> Result<(), Error> {
        self.executor.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), Error> {
        self.executor.rollback().await?;
        Ok(())
    }
}
