//! The `transport` module exposes the relay over HTTP.
//!
//! It defines the request/response bodies, token authentication, the
//! server-push framing of stream events, and the axum router that ties the
//! comment service to the network.

pub mod auth;
pub mod http;
pub mod message;
pub mod wire;

pub use http::{AppState, router, start_http_server};

#[cfg(test)]
mod tests;
