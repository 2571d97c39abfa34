//! Durable comment storage and identity lookups.
//!
//! The relay only needs a narrow view of the platform's data: whether a
//! topic exists, the ordered comments under it, and the display name of an
//! author. Those needs are expressed as the `CommentStore` and
//! `IdentityResolver` traits so the broadcast core never depends on a
//! concrete database.
//!
//! `sled_store` is the on-disk implementation used by the server binary;
//! `memory` keeps everything in process and backs the test suites.

pub mod memory;
pub mod sled_store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::error::StoreError;

pub use memory::MemoryStore;
pub use sled_store::SledStore;

/// Identifier of the content item whose comments are streamed.
pub type TopicId = String;

/// Identifier of an authenticated principal (the token subject).
pub type UserId = String;

/// A persisted comment. Immutable once the store has assigned its id,
/// timestamp and running count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub topic_id: TopicId,
    pub author_id: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
    /// Number of comments on the topic including this one.
    pub comment_count: u64,
}

/// Storage of comments keyed by topic.
pub trait CommentStore: Send + Sync {
    /// Whether `topic` is a known content item.
    fn topic_exists(&self, topic: &str) -> Result<bool, StoreError>;

    /// Persist a new comment and return it with id, timestamp and count filled in.
    fn insert(&self, topic: &str, author: &str, body: &str) -> Result<Comment, StoreError>;

    /// All comments for `topic` in creation order.
    fn list_by_topic(&self, topic: &str) -> Result<Vec<Comment>, StoreError>;
}

/// Runs a synchronous store call on the blocking pool so disk I/O stays off
/// the async workers.
pub async fn run_blocking<T, F>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Unavailable(format!("store task failed: {e}")))?
}

/// Maps a principal to the name shown next to their comments.
pub trait IdentityResolver: Send + Sync {
    /// `None` when the user is unknown or the lookup failed.
    fn display_name(&self, user_id: &str) -> Option<String>;
}
