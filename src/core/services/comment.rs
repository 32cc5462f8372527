use hex::ToHex;
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::core::models::comment::{Comment, CommentBody, CommentCreate, Insert as CommentInsert, Query as CommentQuery};
use crate::core::ports::repository::{CommentCommon, Store};
use crate::core::services::tripcode::derive_display_name;
use crate::core::services::validate::validate_comment_body;
use crate::error::Error;

/// Random token handed to the poster exactly once. Only its sha256
/// lands in the store; losing the token forfeits edit/delete rights.
pub fn generate_owner_key() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    bytes.encode_hex()
}

pub fn hash_owner_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hasher.finalize().encode_hex()
}

pub async fn list_comments<S>(storer: &mut S, survey_id: Uuid) -> Result<Vec<Comment>, Error>
where
    S: Store,
{
    CommentCommon::query(
        storer,
        &CommentQuery {
            survey_id_eq: Some(survey_id),
        },
    )
    .await
}

/// Returns the created comment id together with the one-time key.
pub async fn post_comment<S>(storer: &mut S, survey_id: Uuid, create: CommentCreate) -> Result<(Uuid, String), Error>
where
    S: Store,
{
    validate_comment_body(&create.body)?;
    let author = derive_display_name(&create.author);
    let key = generate_owner_key();
    let id = CommentCommon::insert(
        storer,
        CommentInsert {
            survey_id,
            author,
            body: create.body.trim().to_owned(),
            owner_key_hash: hash_owner_key(&key),
        },
    )
    .await?;
    Ok((id, key))
}

async fn authorize<S>(storer: &mut S, comment_id: Uuid, owner_key: Option<&str>, is_admin: bool) -> Result<(), Error>
where
    S: Store,
{
    if is_admin {
        return Ok(());
    }
    let key = owner_key.ok_or(Error::Unauthorized)?;
    let stored = CommentCommon::owner_key_hash(storer, comment_id).await?;
    if hash_owner_key(key) != stored {
        return Err(Error::Unauthorized);
    }
    Ok(())
}

pub async fn edit_comment<S>(storer: &mut S, comment_id: Uuid, body: String, owner_key: Option<&str>, is_admin: bool) -> Result<(), Error>
where
    S: Store,
{
    validate_comment_body(&body)?;
    authorize(storer, comment_id, owner_key, is_admin).await?;
    let current = CommentCommon::get(storer, comment_id).await?;
    if current.body == CommentBody::Deleted {
        return Err(Error::Validation("削除済みのコメントは編集できません".into()));
    }
    CommentCommon::update_body(storer, comment_id, body.trim().to_owned()).await
}

/// Logical delete: the row stays, reactions and timestamps survive.
pub async fn delete_comment<S>(storer: &mut S, comment_id: Uuid, owner_key: Option<&str>, is_admin: bool) -> Result<(), Error>
where
    S: Store,
{
    authorize(storer, comment_id, owner_key, is_admin).await?;
    CommentCommon::mark_deleted(storer, comment_id).await
}

/// `reacted` is the device-local toggle outcome.
pub async fn apply_reaction<S>(storer: &mut S, comment_id: Uuid, kind: &str, reacted: bool) -> Result<(), Error>
where
    S: Store,
{
    if kind.is_empty() || kind.len() > 16 || !kind.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(Error::Validation("不正なリアクションです".into()));
    }
    CommentCommon::adjust_reaction(storer, comment_id, kind, if reacted { 1 } else { -1 }).await
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_owner_key_is_random_hex() {
        let a = generate_owner_key();
        let b = generate_owner_key();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_owner_key_hash_deterministic() {
        assert_eq!(hash_owner_key("k"), hash_owner_key("k"));
        assert_ne!(hash_owner_key("k"), hash_owner_key("l"));
        assert_ne!(hash_owner_key("k"), "k");
    }
}
