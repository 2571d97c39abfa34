//! HTTP transport
//!
//! Routes:
//! - `GET  /topics/{topic_id}/events`: open a live comment stream
//! - `POST /topics/{topic_id}/events`: create a comment and broadcast it
//! - `GET  /health`: liveness
//!
//! A stream's session lives inside the response body. When the client goes
//! away, or a write to it fails, the server drops the body and with it the
//! session, which deregisters from the registry.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures::stream::{self, Stream};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use super::auth::AuthUser;
use super::message::{CreateCommentRequest, HealthResponse};
use super::wire;
use crate::broker::CommentView;
use crate::publish::CommentService;
use crate::session::StreamSession;
use crate::utils::error::AppError;

/// Shared handler state. Clones share the service and secret.
#[derive(Clone)]
pub struct AppState {
    comments: CommentService,
    jwt_secret: Arc<str>,
    shutdown: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(comments: CommentService, jwt_secret: &str, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            comments,
            jwt_secret: Arc::from(jwt_secret),
            shutdown,
        }
    }

    pub fn comments(&self) -> &CommentService {
        &self.comments
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/topics/{topic_id}/events",
            get(stream_events).post(create_comment),
        )
        .with_state(state)
}

/// Binds `addr` and serves until `shutdown` resolves.
pub async fn start_http_server(
    addr: &str,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        topics: state.comments.registry().topic_count(),
    })
}

async fn stream_events(
    State(state): State<AppState>,
    user: AuthUser,
    Path(topic_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .comments
        .open_stream(&topic_id, state.shutdown.clone())
        .await?;
    info!(topic = %topic_id, user = %user.user_id, "client joined comment stream");

    let headers = [(
        HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    )];
    Ok((headers, Sse::new(session_stream(session))))
}

/// Adapts a session into the body stream. Ends when the session closes.
fn session_stream(session: StreamSession) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(session, |mut session| async move {
        loop {
            let event = session.next_event().await?;
            match wire::to_sse_event(&event) {
                Ok(sse) => return Some((Ok(sse), session)),
                Err(e) => {
                    warn!(topic = %session.topic(), kind = event.kind(), error = %e, "dropping unencodable event");
                }
            }
        }
    })
}

async fn create_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(topic_id): Path<String>,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentView>), AppError> {
    let view = state
        .comments
        .create_comment(&topic_id, &user.user_id, &request.body)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}
