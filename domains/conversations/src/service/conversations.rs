use std::sync::Arc;

use chrono::{DateTime, Utc};
use parley_common::{Error, Pagination, RepositoryError, Result};

use super::{begin, finish};
use crate::domain::entities::{Conversation, NewConversation};
use crate::repository::ChatStore;

#[derive(Clone)]
pub struct ConversationService {
    store: Arc<dyn ChatStore>,
}

impl ConversationService {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    /// Start a conversation, returning its id
    pub async fn create(&self, conversation: NewConversation) -> Result<i64> {
        const OP: &str = "chat.service.create";

        let mut tx = begin(&*self.store, OP).await?;
        let result = match tx.create_conversation(&conversation).await {
            Ok(0) => Err(RepositoryError::InvalidData(
                "store returned an empty conversation id".to_string(),
            )),
            other => other,
        };
        let id = finish(tx, OP, result).await?;

        tracing::info!(
            op = OP,
            conversation_id = id,
            first_user_id = conversation.first_user_id,
            second_user_id = conversation.second_user_id,
            "Conversation created"
        );
        Ok(id)
    }

    pub async fn get(&self, id: i64) -> Result<Conversation> {
        const OP: &str = "chat.service.get";

        let mut tx = begin(&*self.store, OP).await?;
        let result = tx
            .fetch_conversation(id)
            .await
            .and_then(|found| found.ok_or(RepositoryError::NotFound));
        finish(tx, OP, result).await
    }

    /// Like [`get`](Self::get), but a conversation the user is not part of
    /// is reported as not found.
    pub async fn get_for_participant(&self, id: i64, user_id: i64) -> Result<Conversation> {
        let conversation = self.get(id).await?;
        if !conversation.has_participant(user_id) {
            return Err(Error::NotFound("Conversation not found".to_string()));
        }
        Ok(conversation)
    }

    pub async fn list_for_user(
        &self,
        user_id: i64,
        pagination: Pagination,
    ) -> Result<Vec<Conversation>> {
        const OP: &str = "chat.service.list_for_user";

        let mut tx = begin(&*self.store, OP).await?;
        let result = tx
            .fetch_user_conversations(user_id, pagination.limit(), pagination.offset())
            .await;
        finish(tx, OP, result).await
    }

    /// Set the conversation summary in its own transaction.
    ///
    /// A conversation that does not exist is reported as `NotFound`.
    pub async fn update_summary(
        &self,
        id: i64,
        text: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        const OP: &str = "chat.service.update_summary";

        let mut tx = begin(&*self.store, OP).await?;
        let result = match tx.update_conversation_summary(id, text, updated_at).await {
            Ok(0) => Err(RepositoryError::NotFound),
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        };
        finish(tx, OP, result).await
    }
}
