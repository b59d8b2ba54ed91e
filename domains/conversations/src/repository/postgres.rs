//! Postgres gateway

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parley_common::RepositoryError;
use sqlx::{PgPool, Postgres, Transaction};

use super::{ChatStore, ChatTransaction};
use crate::domain::entities::{Conversation, Message, NewConversation, NewMessage};

#[derive(Clone)]
pub struct PgChatStore {
    pool: PgPool,
}

impl PgChatStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatStore for PgChatStore {
    async fn begin(&self) -> Result<Box<dyn ChatTransaction>, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgChatTransaction { tx }))
    }
}

pub struct PgChatTransaction {
    tx: Transaction<'static, Postgres>,
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_foreign_key_violation())
}

#[async_trait]
impl ChatTransaction for PgChatTransaction {
    async fn create_conversation(
        &mut self,
        conversation: &NewConversation,
    ) -> Result<i64, RepositoryError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO conversations (first_user_id, second_user_id, updated_at)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(conversation.first_user_id)
        .bind(conversation.second_user_id)
        .bind(conversation.updated_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(id)
    }

    async fn fetch_conversation(
        &mut self,
        id: i64,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, first_user_id, second_user_id,
                   COALESCE(last_message, '') AS last_message, updated_at
            FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(conversation)
    }

    async fn fetch_user_conversations(
        &mut self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        let conversations = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, first_user_id, second_user_id,
                   COALESCE(last_message, '') AS last_message, updated_at
            FROM conversations
            WHERE first_user_id = $1 OR second_user_id = $1
            ORDER BY updated_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(conversations)
    }

    async fn update_conversation_summary(
        &mut self,
        id: i64,
        text: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE conversations SET last_message = $1, updated_at = $2 WHERE id = $3",
        )
        .bind(text)
        .bind(updated_at)
        .bind(id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn create_message(&mut self, message: &NewMessage) -> Result<i64, RepositoryError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO messages (chat_id, sender, text, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(message.chat_id)
        .bind(message.sender)
        .bind(&message.text)
        .bind(message.created_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                RepositoryError::NotFound
            } else {
                RepositoryError::Connection(e)
            }
        })?;

        Ok(id)
    }

    async fn fetch_messages_by_conversation(
        &mut self,
        conversation_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, RepositoryError> {
        // id breaks ties between messages stamped within the same clock tick
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, chat_id, sender, text, created_at
            FROM messages
            WHERE chat_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(conversation_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(messages)
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
