//! HTTP chat surface.
//!
//! ## Endpoints
//!
//! - `POST /api/chat` with `{"message": "..."}` answers one turn as
//!   `{"descriptor": {...}, "response": "..."}`
//! - `GET /api/notifications` streams reminders and price alerts as
//!   server-sent events named after the notification kind (`reminder`,
//!   `price_alert`), with the [`Notification`] as JSON data
//! - `GET /health` returns `ok`

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

use crate::assistant::Assistant;
use crate::error::{AssistantError, Result};
use crate::handlers::Notification;

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Error body for rejected requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A running server. Dropping it stops the listener.
#[derive(Debug)]
pub struct ChatServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ChatServer {
    /// Bind `addr` (port 0 picks a free port) and serve in the background.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(assistant: Assistant, addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| AssistantError::System(format!("chat server bind failed: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| AssistantError::System(format!("failed to get local addr: {e}")))?;
        info!("chat server listening on http://{addr}");

        let app = router(assistant);
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("chat server error: {e}");
            }
        });
        Ok(Self { addr, handle })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait until the server task ends.
    pub async fn wait(mut self) {
        if let Err(e) = (&mut self.handle).await
            && !e.is_cancelled()
        {
            error!("chat server task failed: {e}");
        }
    }
}

impl Drop for ChatServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Routes, exposed for in-process tests.
pub fn router(assistant: Assistant) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/chat", post(handle_chat))
        .route("/api/notifications", get(handle_notifications))
        .with_state(assistant)
}

async fn handle_chat(
    State(assistant): State<Assistant>,
    Json(request): Json<ChatRequest>,
) -> Response {
    let message = request.message.trim();
    if message.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "message must not be empty".to_owned(),
            }),
        )
            .into_response();
    }
    Json(assistant.respond(message).await).into_response()
}

/// Notifications published after the client connected.
async fn handle_notifications(
    State(assistant): State<Assistant>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    debug!("notification stream opened");
    let stream =
        BroadcastStream::new(assistant.notifier().subscribe()).filter_map(|item| match item {
            Ok(notification) => notification_event(&notification).map(Ok),
            Err(e) => {
                warn!("notification stream: {e}");
                None
            }
        });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn notification_event(notification: &Notification) -> Option<Event> {
    match serde_json::to_string(notification) {
        Ok(json) => Some(
            Event::default()
                .event(notification.kind.as_str())
                .data(json),
        ),
        Err(e) => {
            error!("cannot serialize notification: {e}");
            None
        }
    }
}
