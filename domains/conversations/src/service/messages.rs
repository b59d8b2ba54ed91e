use std::sync::Arc;

use parley_common::{Pagination, RepositoryError, Result, WriteMode};

use super::{begin, finish, log_failure};
use crate::domain::entities::{Message, NewMessage};
use crate::repository::ChatStore;
use crate::service::ConversationService;

/// Records messages and reads history.
#[derive(Clone)]
pub struct MessageService {
    store: Arc<dyn ChatStore>,
    conversations: ConversationService,
    mode: WriteMode,
}

impl MessageService {
    pub fn new(store: Arc<dyn ChatStore>, mode: WriteMode) -> Self {
        Self {
            conversations: ConversationService::new(store.clone()),
            store,
            mode,
        }
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Store a message and bring the conversation summary up to date.
    ///
    /// With [`WriteMode::Atomic`] both writes share one transaction and a
    /// failed summary update (including a missing conversation) discards the
    /// message. With [`WriteMode::Independent`] the message commits first and
    /// a failed summary update is only logged.
    pub async fn record(&self, conversation_id: i64, sender: i64, text: &str) -> Result<Message> {
        const OP: &str = "message.service.record";

        let new = NewMessage::new(conversation_id, sender, text)
            .map_err(|e| log_failure(OP, e))?;

        let message = match self.mode {
            WriteMode::Atomic => self.record_atomic(new).await?,
            WriteMode::Independent => self.record_independent(new).await?,
        };

        tracing::debug!(
            op = OP,
            conversation_id,
            message_id = message.id,
            sender,
            mode = %self.mode,
            "Message recorded"
        );
        Ok(message)
    }

    async fn record_atomic(&self, new: NewMessage) -> Result<Message> {
        const OP: &str = "message.service.record_atomic";

        let mut tx = begin(&*self.store, OP).await?;
        let result = async {
            let id = checked_message_id(tx.create_message(&new).await?)?;
            let touched = tx
                .update_conversation_summary(new.chat_id, &new.text, new.created_at)
                .await?;
            if touched == 0 {
                return Err(RepositoryError::NotFound);
            }
            Ok::<i64, RepositoryError>(id)
        }
        .await;

        let id = finish(tx, OP, result).await?;
        Ok(new.into_message(id))
    }

    async fn record_independent(&self, new: NewMessage) -> Result<Message> {
        const OP: &str = "message.service.record_independent";

        let mut tx = begin(&*self.store, OP).await?;
        let result = tx.create_message(&new).await.and_then(checked_message_id);
        let id = finish(tx, OP, result).await?;

        let message = new.into_message(id);
        if let Err(e) = self
            .conversations
            .update_summary(message.chat_id, &message.text, message.created_at)
            .await
        {
            tracing::warn!(
                op = OP,
                conversation_id = message.chat_id,
                message_id = message.id,
                error = %e,
                "Message stored but conversation summary not updated"
            );
        }

        Ok(message)
    }

    /// Messages of a conversation, newest first
    pub async fn history(
        &self,
        conversation_id: i64,
        pagination: Pagination,
    ) -> Result<Vec<Message>> {
        const OP: &str = "message.service.history";

        let mut tx = begin(&*self.store, OP).await?;
        let result = tx
            .fetch_messages_by_conversation(
                conversation_id,
                pagination.limit(),
                pagination.offset(),
            )
            .await;
        finish(tx, OP, result).await
    }
}

fn checked_message_id(id: i64) -> std::result::Result<i64, RepositoryError> {
    if id == 0 {
        return Err(RepositoryError::InvalidData(
            "store returned an empty message id".to_string(),
        ));
    }
    Ok(id)
}
