use chrono::Utc;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};
use uuid::Uuid;

use super::{Comment, CommentStore, IdentityResolver};
use crate::utils::error::StoreError;

const TOPICS_TREE: &str = "topics";
const USERS_TREE: &str = "users";
const COUNTS_TREE: &str = "comment_counts";
const COMMENTS_PREFIX: &str = "comments/";

/// `sled`-backed store.
///
/// Layout:
/// - `topics`: topic id -> empty marker
/// - `users`: user id -> UTF-8 display name
/// - `comment_counts`: topic id -> big-endian `u64` running count
/// - `comments/<topic>`: big-endian `u64` running count -> JSON `Comment`
///
/// The count bump and the comment write commit in one transaction, and the
/// count doubles as the key, so a tree scan yields comments in creation
/// order with counts `1..=n`.
#[derive(Clone)]
pub struct SledStore {
    db: Db,
}

impl SledStore {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Opens a throwaway database that is removed on drop.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    /// Registers a topic so streams and comments can target it.
    pub fn create_topic(&self, topic: &str) -> Result<(), StoreError> {
        validate_topic(topic)?;
        self.db.open_tree(TOPICS_TREE)?.insert(topic, &b""[..])?;
        Ok(())
    }

    pub fn put_user(&self, user_id: &str, display_name: &str) -> Result<(), StoreError> {
        self.db
            .open_tree(USERS_TREE)?
            .insert(user_id, display_name.as_bytes())?;
        Ok(())
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    fn comments_tree(&self, topic: &str) -> Result<Tree, StoreError> {
        validate_topic(topic)?;
        Ok(self.db.open_tree(format!("{COMMENTS_PREFIX}{topic}"))?)
    }
}

impl CommentStore for SledStore {
    fn topic_exists(&self, topic: &str) -> Result<bool, StoreError> {
        Ok(self.db.open_tree(TOPICS_TREE)?.contains_key(topic)?)
    }

    fn insert(&self, topic: &str, author: &str, body: &str) -> Result<Comment, StoreError> {
        let tree = self.comments_tree(topic)?;
        let counts = self.db.open_tree(COUNTS_TREE)?;

        let outcome = (&counts, &tree).transaction(|(counts, comments)| {
            let comment_count = counts
                .get(topic)?
                .map(|raw| decode_count(&raw))
                .unwrap_or(0)
                + 1;
            let key = comment_count.to_be_bytes();

            let comment = Comment {
                id: Uuid::new_v4(),
                topic_id: topic.to_string(),
                author_id: author.to_string(),
                body: body.to_string(),
                created_at: Utc::now(),
                comment_count,
            };
            let serialized = serde_json::to_vec(&comment)
                .map_err(|e| ConflictableTransactionError::Abort(StoreError::Codec(e)))?;

            counts.insert(topic, &key[..])?;
            comments.insert(&key[..], serialized)?;
            Ok(comment)
        });

        outcome.map_err(|e| match e {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => StoreError::Sled(e),
        })
    }

    fn list_by_topic(&self, topic: &str) -> Result<Vec<Comment>, StoreError> {
        let tree = self.comments_tree(topic)?;
        let mut comments = Vec::new();
        for entry in tree.iter() {
            let (_, value) = entry?;
            match serde_json::from_slice::<Comment>(&value) {
                Ok(comment) => comments.push(comment),
                Err(e) => {
                    tracing::warn!(topic, error = %e, "skipping undecodable comment record");
                }
            }
        }
        Ok(comments)
    }
}

impl IdentityResolver for SledStore {
    fn display_name(&self, user_id: &str) -> Option<String> {
        let lookup = self
            .db
            .open_tree(USERS_TREE)
            .and_then(|users| users.get(user_id));
        match lookup {
            Ok(Some(raw)) => String::from_utf8(raw.to_vec()).ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "display name lookup failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for SledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStore").field("db", &"sled::Db").finish()
    }
}

fn validate_topic(topic: &str) -> Result<(), StoreError> {
    if topic.is_empty() || topic.chars().any(char::is_control) {
        return Err(StoreError::InvalidTopic(topic.to_string()));
    }
    Ok(())
}

fn decode_count(raw: &[u8]) -> u64 {
    raw.try_into().map(u64::from_be_bytes).unwrap_or(0)
}
