//! Per-connection stream sessions.
//!
//! A session registers one subscriber channel, acknowledges the client,
//! replays the topic's stored comments, and then forwards live events with
//! an idle heartbeat until the client goes away, the registry evicts it, or
//! the server shuts down.

pub mod stream;

pub use stream::{SessionState, StreamSession};
