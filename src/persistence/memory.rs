use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use uuid::Uuid;

use super::{Comment, CommentStore, IdentityResolver, TopicId, UserId};
use crate::utils::error::StoreError;

/// In-process store. Comments are kept in insertion order per topic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    topics: RwLock<HashSet<TopicId>>,
    comments: RwLock<HashMap<TopicId, Vec<Comment>>>,
    users: RwLock<HashMap<UserId, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_topic(&self, topic: &str) {
        self.topics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(topic.to_string());
    }

    pub fn put_user(&self, user_id: &str, display_name: &str) {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id.to_string(), display_name.to_string());
    }
}

impl CommentStore for MemoryStore {
    fn topic_exists(&self, topic: &str) -> Result<bool, StoreError> {
        Ok(self
            .topics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(topic))
    }

    fn insert(&self, topic: &str, author: &str, body: &str) -> Result<Comment, StoreError> {
        let mut comments = self.comments.write().unwrap_or_else(PoisonError::into_inner);
        let thread = comments.entry(topic.to_string()).or_default();
        let comment = Comment {
            id: Uuid::new_v4(),
            topic_id: topic.to_string(),
            author_id: author.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
            comment_count: thread.len() as u64 + 1,
        };
        thread.push(comment.clone());
        Ok(comment)
    }

    fn list_by_topic(&self, topic: &str) -> Result<Vec<Comment>, StoreError> {
        Ok(self
            .comments
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .cloned()
            .unwrap_or_default())
    }
}

impl IdentityResolver for MemoryStore {
    fn display_name(&self, user_id: &str) -> Option<String> {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned()
    }
}
