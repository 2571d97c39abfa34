//! # comment-relay
//!
//! `comment-relay` streams comments to everyone currently viewing a content
//! item. Viewers open a long-lived server-push stream per topic, receive the
//! comments already stored for it, and then every new comment as it is
//! posted, with an idle heartbeat to keep intermediaries from closing the
//! connection.
//!
//! ## Core Modules
//!
//! - `broker`: the subscriber registry and the stream event types.
//! - `session`: one stream session per connected viewer.
//! - `publish`: the path from a persisted comment to a fan-out, and the
//!   `CommentService` facade.
//! - `persistence`: the comment store and identity lookup traits with `sled`
//!   and in-memory implementations.
//! - `transport`: HTTP routes, token authentication and wire framing.
//! - `config`: layered configuration loading.
//! - `utils`: error types and logging setup.

pub mod broker;
pub mod config;
pub mod persistence;
pub mod publish;
pub mod session;
pub mod transport;
pub mod utils;
