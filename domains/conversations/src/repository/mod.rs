//! Persistence gateway for the Conversations domain
//!
//! Every command runs inside a caller-supplied [`ChatTransaction`]. The
//! services decide where a logical operation begins, commits or rolls back.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parley_common::RepositoryError;

use crate::domain::entities::{Conversation, Message, NewConversation, NewMessage};

pub use memory::MemoryChatStore;
pub use postgres::PgChatStore;

/// Source of transactions over conversations and messages.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn ChatTransaction>, RepositoryError>;
}

/// Transactional command interface.
#[async_trait]
pub trait ChatTransaction: Send {
    /// Insert a conversation and return its store-assigned id
    async fn create_conversation(
        &mut self,
        conversation: &NewConversation,
    ) -> Result<i64, RepositoryError>;

    async fn fetch_conversation(&mut self, id: i64)
        -> Result<Option<Conversation>, RepositoryError>;

    /// Conversations the user takes part in, most recently updated first
    async fn fetch_user_conversations(
        &mut self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Conversation>, RepositoryError>;

    /// Set last message and timestamp. Returns the number of rows touched;
    /// a missing conversation yields `Ok(0)`.
    async fn update_conversation_summary(
        &mut self,
        id: i64,
        text: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError>;

    /// Insert a message and return its store-assigned id. A message for an
    /// unknown conversation fails with `NotFound`.
    async fn create_message(&mut self, message: &NewMessage) -> Result<i64, RepositoryError>;

    /// Newest first; an empty vector when nothing matches
    async fn fetch_messages_by_conversation(
        &mut self,
        conversation_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, RepositoryError>;

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError>;
}
