//! Chat API endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;

use crate::{
    error::{AppError, AppResult},
    models::chat::{ChatMessage, ChatQuery, CreateChatMessage},
    AppState,
};

/// Recent messages, oldest first
#[utoipa::path(
    get,
    path = "/chat/messages",
    tag = "chat",
    params(ChatQuery),
    responses(
        (status = 200, description = "Messages", body = Vec<ChatMessage>)
    )
)]
pub async fn list_messages(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ChatQuery>, AppError>,
) -> AppResult<Json<Vec<ChatMessage>>> {
    Ok(Json(state.services.chat.recent(query.limit).await?))
}

/// Post a message
#[utoipa::path(
    post,
    path = "/chat/messages",
    tag = "chat",
    request_body = CreateChatMessage,
    responses(
        (status = 201, description = "Message stored", body = ChatMessage),
        (status = 400, description = "Empty message", body = crate::error::ErrorResponse)
    )
)]
pub async fn post_message(
    State(state): State<AppState>,
    WithRejection(Json(message), _): WithRejection<Json<CreateChatMessage>, AppError>,
) -> AppResult<(StatusCode, Json<ChatMessage>)> {
    let stored = state.services.chat.post(message).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// Mark a message as read
#[utoipa::path(
    post,
    path = "/chat/messages/{id}/read",
    tag = "chat",
    params(("id" = i64, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Message marked read", body = ChatMessage),
        (status = 404, description = "Message not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn mark_read(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<Json<ChatMessage>> {
    Ok(Json(state.services.chat.mark_read(id).await?))
}
