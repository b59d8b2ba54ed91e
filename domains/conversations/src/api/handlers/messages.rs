//! Message API handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use parley_auth::AuthUser;
use parley_common::{Pagination, Result, ValidatedJson};
use serde::Deserialize;
use validator::Validate;

use crate::api::middleware::ConversationsState;
use crate::domain::entities::Message;

/// Request for sending a message
#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    /// Message text; trimmed and length-checked when recorded
    #[validate(length(min = 1))]
    pub text: String,
}

/// Record a message and push it to anyone connected to the conversation
pub async fn send_message(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
    Path(conversation_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>)> {
    state
        .conversations
        .get_for_participant(conversation_id, ctx.user_id())
        .await?;

    let message = state
        .messages
        .record(conversation_id, ctx.user_id(), &req.text)
        .await?;
    state.rooms.publish(message.clone());

    Ok((StatusCode::CREATED, Json(message)))
}

/// List messages for a conversation, newest first
pub async fn list_messages(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
    Path(conversation_id): Path<i64>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<Message>>> {
    state
        .conversations
        .get_for_participant(conversation_id, ctx.user_id())
        .await?;

    let messages = state
        .messages
        .history(conversation_id, pagination)
        .await?;

    Ok(Json(messages))
}
