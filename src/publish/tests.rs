use std::sync::Arc;

use super::{CommentService, publish_comment};
use crate::broker::{StreamEvent, SubscriberRegistry};
use crate::config::Settings;
use crate::persistence::{Comment, CommentStore, IdentityResolver, MemoryStore};
use crate::utils::error::{AppError, StoreError};

fn service_with(store: Arc<MemoryStore>) -> CommentService {
    CommentService::new(
        store.clone(),
        store,
        SubscriberRegistry::new(),
        &Settings::default().stream,
    )
}

/// Store whose writes always fail; reads delegate to an inner memory store.
struct BrokenWrites(MemoryStore);

impl CommentStore for BrokenWrites {
    fn topic_exists(&self, topic: &str) -> Result<bool, StoreError> {
        self.0.topic_exists(topic)
    }

    fn insert(&self, _topic: &str, _author: &str, _body: &str) -> Result<Comment, StoreError> {
        Err(StoreError::Unavailable("disk full".into()))
    }

    fn list_by_topic(&self, topic: &str) -> Result<Vec<Comment>, StoreError> {
        self.0.list_by_topic(topic)
    }
}

#[test]
fn test_publish_comment_builds_new_comment_event() {
    let store = MemoryStore::new();
    store.create_topic("post-1");
    store.put_user("u1", "Ada");
    let comment = store.insert("post-1", "u1", "new").unwrap();

    let registry = SubscriberRegistry::new();
    let mut sub = registry.subscribe("post-1");

    let view = publish_comment(&registry, &store, &comment);
    assert_eq!(view.author_name, "Ada");
    assert_eq!(view.comment_count, 1);

    match sub.try_recv() {
        Some(StreamEvent::NewComment(got)) => assert_eq!(got, view),
        other => panic!("expected new_comment, got {other:?}"),
    }
}

#[test]
fn test_publish_comment_with_unknown_author_uses_empty_name() {
    let store = MemoryStore::new();
    store.create_topic("post-1");
    let comment = store.insert("post-1", "ghost", "boo").unwrap();

    let registry = SubscriberRegistry::new();
    let view = publish_comment(&registry, &store as &dyn IdentityResolver, &comment);
    assert_eq!(view.author_name, "");
    assert_eq!(view.author_id, "ghost");
}

#[tokio::test]
async fn test_create_comment_fans_out_to_topic_only() {
    let store = Arc::new(MemoryStore::new());
    store.create_topic("t");
    store.create_topic("t2");
    store.put_user("u3", "Third");
    let service = service_with(store.clone());

    let mut a = service.registry().subscribe("t");
    let mut b = service.registry().subscribe("t");
    let mut other = service.registry().subscribe("t2");

    let view = service.create_comment("t", "u3", "  new  ").await.unwrap();
    assert_eq!(view.body, "new");
    assert_eq!(view.author_name, "Third");
    assert_eq!(view.comment_count, 1);

    for sub in [&mut a, &mut b] {
        match sub.try_recv() {
            Some(StreamEvent::NewComment(got)) => assert_eq!(got.body, "new"),
            other => panic!("expected new_comment, got {other:?}"),
        }
        assert!(sub.try_recv().is_none());
    }
    assert!(other.try_recv().is_none());
    assert_eq!(store.list_by_topic("t").unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_comment_rejects_unknown_topic() {
    let store = Arc::new(MemoryStore::new());
    let service = service_with(store.clone());
    let mut sub = service.registry().subscribe("ghost");

    let err = service.create_comment("ghost", "u1", "hello").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref t) if t == "ghost"));
    assert!(sub.try_recv().is_none());
    assert!(store.list_by_topic("ghost").unwrap().is_empty());
}

#[tokio::test]
async fn test_create_comment_validates_body() {
    let store = Arc::new(MemoryStore::new());
    store.create_topic("t");
    let mut settings = Settings::default().stream;
    settings.max_comment_len = 5;
    let service = CommentService::new(store.clone(), store, SubscriberRegistry::new(), &settings);

    assert!(matches!(
        service.create_comment("t", "u1", "   ").await,
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        service.create_comment("t", "u1", "too long").await,
        Err(AppError::BadRequest(_))
    ));
    assert!(service.create_comment("t", "u1", "short").await.is_ok());
}

#[tokio::test]
async fn test_persistence_failure_publishes_nothing() {
    let inner = MemoryStore::new();
    inner.create_topic("t");
    let identity = Arc::new(MemoryStore::new());
    let service = CommentService::new(
        Arc::new(BrokenWrites(inner)),
        identity,
        SubscriberRegistry::new(),
        &Settings::default().stream,
    );
    let mut sub = service.registry().subscribe("t");

    let err = service.create_comment("t", "u1", "lost").await.unwrap_err();
    assert!(matches!(err, AppError::Storage(StoreError::Unavailable(_))));
    assert!(sub.try_recv().is_none());
}

#[tokio::test]
async fn test_open_stream_unknown_topic_allocates_nothing() {
    let store = Arc::new(MemoryStore::new());
    let service = service_with(store);
    let (_tx, rx) = tokio::sync::watch::channel(false);

    let err = service.open_stream("missing", rx).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(service.registry().topic_count(), 0);
}
