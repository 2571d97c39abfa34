//! Bridge from durable comment writes to live fan-out.
//!
//! `publish_comment` is the narrow path run after a comment has been
//! persisted. `CommentService` bundles it with the stores and the registry
//! and is the single entry point the HTTP layer and stream sessions use.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::broker::{CommentView, StreamEvent, SubscriberRegistry};
use crate::config::StreamSettings;
use crate::persistence::{Comment, CommentStore, IdentityResolver, run_blocking};
use crate::session::StreamSession;
use crate::utils::error::AppError;

/// Turns a persisted comment into a `new_comment` event and fans it out.
///
/// Returns the enriched view so callers can echo it back. Fan-out itself
/// cannot fail.
pub fn publish_comment(
    registry: &SubscriberRegistry,
    identity: &dyn IdentityResolver,
    comment: &Comment,
) -> CommentView {
    let view = CommentView::from_comment(comment, identity.display_name(&comment.author_id));
    let event = StreamEvent::NewComment(view.clone());
    let report = registry.publish(&comment.topic_id, &event);
    debug!(
        topic = %comment.topic_id,
        comment = %comment.id,
        delivered = report.delivered,
        evicted = report.evicted,
        "comment fanned out"
    );
    view
}

/// Comment creation and stream opening over shared collaborators.
///
/// Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn CommentStore>,
    identity: Arc<dyn IdentityResolver>,
    registry: SubscriberRegistry,
    heartbeat: Duration,
    max_comment_len: usize,
}

impl CommentService {
    pub fn new(
        store: Arc<dyn CommentStore>,
        identity: Arc<dyn IdentityResolver>,
        registry: SubscriberRegistry,
        settings: &StreamSettings,
    ) -> Self {
        Self {
            store,
            identity,
            registry,
            heartbeat: Duration::from_secs(settings.heartbeat_secs.max(1)),
            max_comment_len: settings.max_comment_len,
        }
    }

    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn CommentStore> {
        &self.store
    }

    pub fn identity(&self) -> &Arc<dyn IdentityResolver> {
        &self.identity
    }

    pub fn heartbeat(&self) -> Duration {
        self.heartbeat
    }

    /// Validates, persists and broadcasts a new comment.
    ///
    /// Nothing is published unless the insert succeeded.
    pub async fn create_comment(
        &self,
        topic: &str,
        author: &str,
        body: &str,
    ) -> Result<CommentView, AppError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(AppError::BadRequest("comment body must not be empty".into()));
        }
        if body.chars().count() > self.max_comment_len {
            return Err(AppError::BadRequest(format!(
                "comment body exceeds {} characters",
                self.max_comment_len
            )));
        }

        let store = self.store.clone();
        let (owned_topic, owned_author, owned_body) =
            (topic.to_string(), author.to_string(), body.to_string());
        let inserted = run_blocking(move || {
            if !store.topic_exists(&owned_topic)? {
                return Ok(None);
            }
            store.insert(&owned_topic, &owned_author, &owned_body).map(Some)
        })
        .await?;
        let Some(comment) = inserted else {
            return Err(AppError::NotFound(topic.to_string()));
        };
        info!(topic, comment = %comment.id, author, "comment created");

        Ok(publish_comment(&self.registry, self.identity.as_ref(), &comment))
    }

    /// Opens a stream session for `topic`. Unknown topics are rejected before
    /// anything is registered.
    pub async fn open_stream(
        &self,
        topic: &str,
        shutdown: watch::Receiver<bool>,
    ) -> Result<StreamSession, AppError> {
        let store = self.store.clone();
        let owned_topic = topic.to_string();
        if !run_blocking(move || store.topic_exists(&owned_topic)).await? {
            return Err(AppError::NotFound(topic.to_string()));
        }
        Ok(StreamSession::connect(self, topic, shutdown))
    }
}

impl std::fmt::Debug for CommentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommentService")
            .field("registry", &self.registry)
            .field("heartbeat", &self.heartbeat)
            .field("max_comment_len", &self.max_comment_len)
            .finish()
    }
}

#[cfg(test)]
mod tests;
