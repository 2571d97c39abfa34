//! Topic membership
//!
//! A `Topic` holds the delivery senders of every live subscriber of one
//! content item, keyed by `SubscriberId`. Duplicate subscriptions replace the
//! previous sender; removing an absent id is a no-op.
//!
//! Callers must synchronize access (the registry keeps topics behind its lock).

use std::collections::HashMap;

use tokio::sync::mpsc::Sender;
use uuid::Uuid;

use super::message::StreamEvent;
use crate::persistence::TopicId;

/// Stable per-session handle used as the membership key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[derive(Debug)]
pub struct Topic {
    pub name: TopicId,
    subscribers: HashMap<SubscriberId, Sender<StreamEvent>>,
}

impl Topic {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: HashMap::new(),
        }
    }

    pub fn subscribe(&mut self, id: SubscriberId, sender: Sender<StreamEvent>) {
        self.subscribers.insert(id, sender);
    }

    /// Returns whether `id` was present.
    pub fn unsubscribe(&mut self, id: &SubscriberId) -> bool {
        self.subscribers.remove(id).is_some()
    }

    pub fn contains(&self, id: &SubscriberId) -> bool {
        self.subscribers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn subscribers(&self) -> impl Iterator<Item = (&SubscriberId, &Sender<StreamEvent>)> {
        self.subscribers.iter()
    }
}
