// handlers/protected/messages.rs - project chat

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Extension, Json,
};
use futures::{stream, Stream, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{Message, MessageWithAuthor};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::session::Session;

#[derive(Debug, Deserialize)]
pub struct SendMessage {
    #[serde(default)]
    pub message: String,
}

/// GET /api/projects/:id/messages - thread, oldest first
pub async fn list(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<MessageWithAuthor>> {
    Ok(ApiResponse::success(state.chat.messages(&session, id).await?))
}

/// POST /api/projects/:id/messages - `{ "message": "..." }`
pub async fn send(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
    payload: Result<Json<SendMessage>, JsonRejection>,
) -> ApiResult<Message> {
    let Json(body) = payload?;
    Ok(ApiResponse::created(state.chat.send(&session, id, &body.message).await?))
}

/// GET /api/projects/:id/messages/stream - server-sent `messages` events
///
/// The first event carries the current thread; each new message in the
/// project pushes the reloaded thread. Closing the connection drops the feed.
pub async fn stream(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let feed = state.chat.open_feed(&session, id).await?;
    let initial = feed.current();

    let updates = stream::unfold(feed, |mut feed| async move {
        let messages = feed.changed().await?;
        Some((messages, feed))
    });
    let events = stream::once(async move { initial })
        .chain(updates)
        .map(|messages| Event::default().event("messages").json_data(&messages));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
