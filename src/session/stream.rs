use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::broker::{CommentView, StreamEvent, Subscription};
use crate::persistence::{CommentStore, IdentityResolver, TopicId, run_blocking};
use crate::publish::CommentService;

/// Where a session is in its lifecycle.
///
/// Topic validation and registration happen before a session exists, so the
/// first observable state is `Connecting`, which only emits the
/// acknowledgement.
#[derive(Debug)]
pub enum SessionState {
    Connecting,
    Replaying(VecDeque<StreamEvent>),
    Streaming,
    Closed,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Connecting => "connecting",
            SessionState::Replaying(_) => "replaying",
            SessionState::Streaming => "streaming",
            SessionState::Closed => "closed",
        }
    }
}

enum Wake {
    Delivered(Option<StreamEvent>),
    Idle,
    Shutdown,
}

/// One client's view of a topic, from registration to teardown.
///
/// Pull events with [`StreamSession::next_event`]; `None` means the session
/// is closed. The registry membership lives in the owned `Subscription`,
/// which deregisters on drop, so every exit path (closing, dropping the
/// session mid-await, a panic while streaming) cleans up exactly once.
///
/// Events published between registration and the end of replay can arrive
/// out of order relative to the replayed history, or duplicate it. Clients
/// reconcile by comment id.
pub struct StreamSession {
    topic: TopicId,
    state: SessionState,
    subscription: Option<Subscription>,
    store: Arc<dyn CommentStore>,
    identity: Arc<dyn IdentityResolver>,
    heartbeat: Duration,
    shutdown: watch::Receiver<bool>,
}

impl StreamSession {
    /// Registers with the service's registry. The caller has already checked
    /// that the topic exists.
    pub(crate) fn connect(
        service: &CommentService,
        topic: &str,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let subscription = service.registry().subscribe(topic);
        info!(topic, subscriber = %subscription.id(), "stream session opened");

        Self {
            topic: topic.to_string(),
            state: SessionState::Connecting,
            subscription: Some(subscription),
            store: service.store().clone(),
            identity: service.identity().clone(),
            heartbeat: service.heartbeat(),
            shutdown,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }

    /// Produces the next event for the client.
    ///
    /// While streaming this waits for a published event, the heartbeat
    /// window to elapse with nothing else ready (yielding a ping), or
    /// shutdown. Cancel-safe: dropping the future loses no queued event.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            match &mut self.state {
                SessionState::Connecting => {
                    let backlog = self.load_history().await;
                    self.state = SessionState::Replaying(backlog);
                    return Some(StreamEvent::connected(&self.topic));
                }
                SessionState::Replaying(backlog) => match backlog.pop_front() {
                    Some(event) => return Some(event),
                    None => {
                        debug!(topic = %self.topic, "replay complete, streaming");
                        self.state = SessionState::Streaming;
                    }
                },
                SessionState::Streaming => {
                    let Some(subscription) = self.subscription.as_mut() else {
                        self.close("no subscription");
                        return None;
                    };

                    let wake = tokio::select! {
                        received = subscription.recv() => Wake::Delivered(received),
                        _ = tokio::time::sleep(self.heartbeat) => Wake::Idle,
                        _ = shutdown_signalled(&mut self.shutdown) => Wake::Shutdown,
                    };

                    match wake {
                        Wake::Delivered(Some(event)) => return Some(event),
                        Wake::Delivered(None) => {
                            self.close("evicted by registry");
                            return None;
                        }
                        Wake::Idle => return Some(StreamEvent::ping()),
                        Wake::Shutdown => {
                            self.close("shutdown");
                            return None;
                        }
                    }
                }
                SessionState::Closed => return None,
            }
        }
    }

    /// Deregisters and releases the channel. Safe to call more than once.
    pub fn close(&mut self, reason: &str) {
        if let Some(subscription) = self.subscription.take() {
            info!(topic = %self.topic, subscriber = %subscription.id(), reason, "stream session closed");
            drop(subscription);
        }
        self.state = SessionState::Closed;
    }

    async fn load_history(&mut self) -> VecDeque<StreamEvent> {
        let store = self.store.clone();
        let identity = self.identity.clone();
        let topic = self.topic.clone();

        let loaded = run_blocking(move || {
            let comments = store.list_by_topic(&topic)?;
            Ok(comments
                .iter()
                .map(|comment| {
                    let name = identity.display_name(&comment.author_id);
                    if name.is_none() {
                        debug!(topic = %topic, author = %comment.author_id, "author name unresolved");
                    }
                    StreamEvent::ExistingComment(CommentView::from_comment(comment, name))
                })
                .collect::<VecDeque<_>>())
        })
        .await;

        loaded.unwrap_or_else(|e| {
            warn!(topic = %self.topic, error = %e, "history unavailable, skipping replay");
            VecDeque::new()
        })
    }
}

async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    let signalled = shutdown.wait_for(|stop| *stop).await.is_ok();
    if !signalled {
        // sender dropped without signalling
        std::future::pending::<()>().await;
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("topic", &self.topic)
            .field("state", &self.state.name())
            .field("subscription", &self.subscription.as_ref().map(Subscription::id))
            .finish()
    }
}
