//! Subscriber registry
//!
//! The registry maps each topic to the delivery channels of its live stream
//! sessions and fans published events out to them. Responsibilities:
//! - hand out a bounded channel per subscriber (`subscribe`)
//! - forget subscribers, dropping a topic with its last member (`unsubscribe`)
//! - deliver an event to every member of a topic without ever waiting (`publish`)
//!
//! Concurrency notes:
//! - The topic map sits behind one `RwLock`. Fan-out holds the read lock;
//!   membership changes hold the write lock. Neither lock is held across an
//!   `.await` or any I/O.
//! - Delivery uses `try_send`. A subscriber whose channel is full or closed
//!   loses that event and is removed from the registry. Removing the
//!   registry's sender is what the owning session observes as its channel
//!   closing.
//! - The registry never owns a receiver. The `Subscription` handle does, and
//!   deregisters itself on drop before its receiver is released.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use super::message::StreamEvent;
use super::topic::{SubscriberId, Topic};
use crate::persistence::TopicId;

type TopicMap = HashMap<TopicId, Topic>;

/// Shared, cloneable handle to the topic -> subscriber map.
///
/// Clones share state. Create one per process (or per test) and inject it
/// wherever subscriptions or publishes happen.
#[derive(Debug, Clone)]
pub struct SubscriberRegistry {
    topics: Arc<RwLock<TopicMap>>,
    capacity: usize,
}

/// Outcome of one fan-out. Only used for logging and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub evicted: usize,
}

impl SubscriberRegistry {
    /// Default per-subscriber channel capacity.
    pub const DEFAULT_CAPACITY: usize = 64;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// `capacity` bounds how many undelivered events a subscriber may have
    /// queued before it is treated as stalled. Zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Registers a new subscriber under `topic`, creating the topic entry if
    /// needed.
    pub fn subscribe(&self, topic: &str) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let id = SubscriberId::new();

        {
            let mut topics = self.write();
            topics
                .entry(topic.to_string())
                .or_insert_with(|| Topic::new(topic))
                .subscribe(id, sender);
        }

        debug!(topic, subscriber = %id, "subscriber registered");

        Subscription {
            topic: topic.to_string(),
            id,
            receiver,
            registry: self.clone(),
        }
    }

    /// Removes `id` from `topic`. Removing an unknown id is a no-op.
    pub fn unsubscribe(&self, topic: &str, id: &SubscriberId) {
        let removed = {
            let mut topics = self.write();
            remove_locked(&mut topics, topic, id)
        };
        if removed {
            debug!(topic, subscriber = %id, "subscriber removed");
        }
    }

    /// Delivers `event` to every subscriber of `topic` without blocking.
    ///
    /// Subscribers that cannot take the event right away are dropped from
    /// the registry. Each subscriber sees events in publish order.
    pub fn publish(&self, topic: &str, event: &StreamEvent) -> PublishReport {
        let mut report = PublishReport::default();
        let mut stalled = Vec::new();

        {
            let topics = self.read();
            let Some(entry) = topics.get(topic) else {
                debug!(topic, kind = event.kind(), "no subscribers for topic");
                return report;
            };

            for (id, sender) in entry.subscribers() {
                match sender.try_send(event.clone()) {
                    Ok(()) => report.delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        warn!(topic, subscriber = %id, "subscriber channel full, evicting");
                        stalled.push(*id);
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!(topic, subscriber = %id, "subscriber channel closed, evicting");
                        stalled.push(*id);
                    }
                }
            }
        }

        if !stalled.is_empty() {
            let mut topics = self.write();
            report.evicted = stalled
                .iter()
                .filter(|id| remove_locked(&mut topics, topic, id))
                .count();
        }

        debug!(
            topic,
            kind = event.kind(),
            delivered = report.delivered,
            evicted = report.evicted,
            "event published"
        );
        report
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.read().get(topic).map_or(0, Topic::len)
    }

    pub fn topic_count(&self) -> usize {
        self.read().len()
    }

    pub fn is_subscribed(&self, topic: &str, id: &SubscriberId) -> bool {
        self.read().get(topic).is_some_and(|t| t.contains(id))
    }

    fn read(&self) -> RwLockReadGuard<'_, TopicMap> {
        self.topics.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TopicMap> {
        self.topics.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn remove_locked(topics: &mut TopicMap, topic: &str, id: &SubscriberId) -> bool {
    let Some(entry) = topics.get_mut(topic) else {
        return false;
    };
    let removed = entry.unsubscribe(id);
    if entry.is_empty() {
        topics.remove(topic);
    }
    removed
}

/// The receiving side of one registration.
///
/// Dropping the handle deregisters it from the registry, then releases the
/// channel.
#[derive(Debug)]
pub struct Subscription {
    topic: TopicId,
    id: SubscriberId,
    receiver: mpsc::Receiver<StreamEvent>,
    registry: SubscriberRegistry,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Waits for the next event. `None` once the registry has dropped this
    /// subscriber and every queued event has been taken.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<StreamEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.unsubscribe(&self.topic, &self.id);
    }
}
