//! Events pushed to stream subscribers.
//!
//! On the wire every event is a named block whose name is the event `kind`
//! and whose data is the JSON payload; see `transport::wire`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::persistence::{Comment, TopicId, UserId};

/// One delivery to a subscriber. Built fresh per delivery, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum StreamEvent {
    Connected(ConnectedPayload),
    ExistingComment(CommentView),
    NewComment(CommentView),
    Ping(PingPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectedPayload {
    pub topic_id: TopicId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingPayload {
    #[serde(with = "timestamp")]
    pub at: DateTime<Utc>,
}

/// A comment enriched with its author's display name.
///
/// This is both the payload of comment events and the body returned by the
/// comment creation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: Uuid,
    pub topic_id: TopicId,
    pub author_id: UserId,
    /// Empty when the author could not be resolved.
    pub author_name: String,
    pub body: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub comment_count: u64,
}

impl CommentView {
    pub fn from_comment(comment: &Comment, author_name: Option<String>) -> Self {
        Self {
            id: comment.id,
            topic_id: comment.topic_id.clone(),
            author_id: comment.author_id.clone(),
            author_name: author_name.unwrap_or_default(),
            body: comment.body.clone(),
            created_at: comment.created_at,
            comment_count: comment.comment_count,
        }
    }
}

impl StreamEvent {
    pub fn connected(topic_id: &str) -> Self {
        StreamEvent::Connected(ConnectedPayload {
            topic_id: topic_id.to_string(),
        })
    }

    pub fn ping() -> Self {
        StreamEvent::Ping(PingPayload { at: Utc::now() })
    }

    /// The event name used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Connected(_) => "connected",
            StreamEvent::ExistingComment(_) => "existing_comment",
            StreamEvent::NewComment(_) => "new_comment",
            StreamEvent::Ping(_) => "ping",
        }
    }

    /// Serializes only the payload, without the `kind` envelope.
    pub fn payload_json(&self) -> Result<String, serde_json::Error> {
        match self {
            StreamEvent::Connected(p) => serde_json::to_string(p),
            StreamEvent::ExistingComment(c) | StreamEvent::NewComment(c) => {
                serde_json::to_string(c)
            }
            StreamEvent::Ping(p) => serde_json::to_string(p),
        }
    }

    /// Rebuilds an event from a wire name and payload.
    pub fn from_wire(kind: &str, payload: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(payload)?;
        serde_json::from_value(serde_json::json!({ "kind": kind, "payload": value }))
    }
}

/// RFC 3339 in UTC with millisecond precision, e.g. `2024-05-01T12:00:00.000Z`.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(at: &DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|at| at.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
