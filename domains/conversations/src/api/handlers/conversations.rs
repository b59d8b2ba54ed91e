//! Conversation management API handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use parley_auth::AuthUser;
use parley_common::{Error, Pagination, Result, ValidatedJson};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::middleware::ConversationsState;
use crate::domain::entities::{Conversation, NewConversation};

/// Request for starting a conversation
#[derive(Debug, Deserialize, Validate)]
pub struct CreateConversationRequest {
    #[validate(range(min = 1))]
    pub first_user_id: i64,

    #[validate(range(min = 1))]
    pub second_user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct CreateConversationResponse {
    pub id: i64,
}

/// Start a conversation between two users, one of whom must be the caller
pub async fn create_conversation(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
    ValidatedJson(req): ValidatedJson<CreateConversationRequest>,
) -> Result<(StatusCode, Json<CreateConversationResponse>)> {
    if !ctx.is_participant(req.first_user_id, req.second_user_id) {
        return Err(Error::Validation(
            "You cannot create a conversation you are not a member of".to_string(),
        ));
    }

    let conversation = NewConversation::new(req.first_user_id, req.second_user_id)?;
    let id = state.conversations.create(conversation).await?;

    Ok((StatusCode::CREATED, Json(CreateConversationResponse { id })))
}

/// List the caller's conversations, most recently active first
pub async fn list_conversations(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<Conversation>>> {
    let conversations = state
        .conversations
        .list_for_user(ctx.user_id(), pagination)
        .await?;

    Ok(Json(conversations))
}

/// Get a single conversation by ID
pub async fn get_conversation(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
    Path(id): Path<i64>,
) -> Result<Json<Conversation>> {
    let conversation = state
        .conversations
        .get_for_participant(id, ctx.user_id())
        .await?;

    Ok(Json(conversation))
}
