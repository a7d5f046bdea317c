use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;

use super::domain::{is_like_title, DirectMessage, InboxMessage};
use super::store::{NewDirectMessage, NotificationStore, StoreError};
use crate::api::{ApiResponse, RequestContext};
use crate::workflows::ids::{MessageId, UserId};

/// State shared by the inbox endpoints.
#[derive(Clone)]
pub struct NotifyRouterState {
    pub store: Arc<dyn NotificationStore>,
}

/// Route table for the user-facing message inbox.
pub fn notification_router(state: NotifyRouterState) -> Router {
    Router::new()
        .route("/notification/me/messages/system", get(system_messages))
        .route("/notification/me/messages/likes", get(like_messages))
        .route(
            "/notification/me/messages/direct",
            get(direct_messages).post(send_direct),
        )
        .route("/notification/me/messages/:id/read", put(mark_read))
        .route("/notification/me/messages/read-all", put(mark_all_read))
        .with_state(state)
}

fn store_error(err: &StoreError) -> Response {
    match err {
        StoreError::NotFound => ApiResponse::<()>::error(404, "message not found").into_response(),
        StoreError::Unavailable(_) => {
            ApiResponse::<()>::error(500, err.to_string()).into_response()
        }
    }
}

/// System notifications are inbox messages minus like notices, which are
/// recognizable by their title.
async fn system_messages(
    State(state): State<NotifyRouterState>,
    context: RequestContext,
) -> Response {
    match state.store.inbox_for_user(context.user_id) {
        Ok(messages) => {
            let system: Vec<InboxMessage> = messages
                .into_iter()
                .filter(|message| !is_like_title(&message.title))
                .collect();
            ApiResponse::success(system).into_response()
        }
        Err(err) => store_error(&err),
    }
}

async fn like_messages(
    State(state): State<NotifyRouterState>,
    context: RequestContext,
) -> Response {
    match state.store.inbox_for_user(context.user_id) {
        Ok(messages) => {
            let likes: Vec<InboxMessage> = messages
                .into_iter()
                .filter(|message| is_like_title(&message.title))
                .collect();
            ApiResponse::success(likes).into_response()
        }
        Err(err) => store_error(&err),
    }
}

async fn direct_messages(
    State(state): State<NotifyRouterState>,
    context: RequestContext,
) -> Response {
    match state.store.direct_for_user(context.user_id) {
        Ok(messages) => ApiResponse::<Vec<DirectMessage>>::success(messages).into_response(),
        Err(err) => store_error(&err),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendDirectRequest {
    to_user_id: UserId,
    content: String,
}

async fn send_direct(
    State(state): State<NotifyRouterState>,
    context: RequestContext,
    Json(request): Json<SendDirectRequest>,
) -> Response {
    if request.to_user_id == context.user_id {
        return ApiResponse::<()>::error(400, "cannot send a direct message to yourself")
            .into_response();
    }
    if request.content.trim().is_empty() {
        return ApiResponse::<()>::error(400, "message content is required").into_response();
    }

    match state.store.insert_direct(NewDirectMessage {
        from_user_id: context.user_id,
        to_user_id: request.to_user_id,
        content: request.content,
        created_at: Utc::now(),
    }) {
        Ok(message) => ApiResponse::success(message).into_response(),
        Err(err) => store_error(&err),
    }
}

async fn mark_read(
    State(state): State<NotifyRouterState>,
    _context: RequestContext,
    Path(id): Path<i64>,
) -> Response {
    match state.store.mark_read(MessageId(id)) {
        Ok(()) => ApiResponse::success("message marked read").into_response(),
        Err(err) => store_error(&err),
    }
}

async fn mark_all_read(
    State(state): State<NotifyRouterState>,
    context: RequestContext,
) -> Response {
    match state.store.mark_all_read(context.user_id) {
        Ok(()) => ApiResponse::success("all messages marked read").into_response(),
        Err(err) => store_error(&err),
    }
}
