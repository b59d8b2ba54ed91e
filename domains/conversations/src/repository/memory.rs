//! In-memory gateway
//!
//! Writes are staged on the transaction and only become visible to other
//! transactions on commit. Ids come from shared counters and, like database
//! sequences, are not reused after a rollback. Store faults can be injected
//! to exercise the write pipeline's failure paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parley_common::RepositoryError;

use super::{ChatStore, ChatTransaction};
use crate::domain::entities::{Conversation, Message, NewConversation, NewMessage};

#[derive(Debug, Clone, Default)]
struct Tables {
    conversations: BTreeMap<i64, Conversation>,
    messages: Vec<Message>,
}

#[derive(Debug, Default)]
struct Sequences {
    conversation: i64,
    message: i64,
}

#[derive(Debug, Default)]
struct Faults {
    summary_updates: AtomicBool,
    message_inserts: AtomicBool,
}

#[derive(Debug, Clone)]
enum Write {
    Conversation(Conversation),
    Message(Message),
    Summary {
        id: i64,
        text: String,
        updated_at: DateTime<Utc>,
    },
}

impl Write {
    fn apply(self, tables: &mut Tables) {
        match self {
            Write::Conversation(conversation) => {
                tables.conversations.insert(conversation.id, conversation);
            }
            Write::Message(message) => tables.messages.push(message),
            Write::Summary {
                id,
                text,
                updated_at,
            } => {
                if let Some(conversation) = tables.conversations.get_mut(&id) {
                    conversation.last_message = text;
                    conversation.updated_at = updated_at;
                }
            }
        }
    }
}

/// In-memory [`ChatStore`] for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryChatStore {
    tables: Arc<Mutex<Tables>>,
    sequences: Arc<Mutex<Sequences>>,
    faults: Arc<Faults>,
}

impl MemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent summary update fail with `Unavailable`
    pub fn fail_summary_updates(&self, fail: bool) {
        self.faults.summary_updates.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent message insert fail with `Unavailable`
    pub fn fail_message_inserts(&self, fail: bool) {
        self.faults.message_inserts.store(fail, Ordering::SeqCst);
    }

    /// Committed conversation, bypassing transactions
    pub fn conversation(&self, id: i64) -> Option<Conversation> {
        self.tables
            .lock()
            .ok()
            .and_then(|tables| tables.conversations.get(&id).cloned())
    }

    /// Number of committed messages
    pub fn message_count(&self) -> usize {
        self.tables.lock().map_or(0, |tables| tables.messages.len())
    }

    fn lock_tables(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("memory store poisoned".to_string()))
    }

    fn next_conversation_id(&self) -> Result<i64, RepositoryError> {
        let mut sequences = self
            .sequences
            .lock()
            .map_err(|_| RepositoryError::Unavailable("memory store poisoned".to_string()))?;
        sequences.conversation += 1;
        Ok(sequences.conversation)
    }

    fn next_message_id(&self) -> Result<i64, RepositoryError> {
        let mut sequences = self
            .sequences
            .lock()
            .map_err(|_| RepositoryError::Unavailable("memory store poisoned".to_string()))?;
        sequences.message += 1;
        Ok(sequences.message)
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn begin(&self) -> Result<Box<dyn ChatTransaction>, RepositoryError> {
        Ok(Box::new(MemoryChatTransaction {
            store: self.clone(),
            staged: Vec::new(),
        }))
    }
}

pub struct MemoryChatTransaction {
    store: MemoryChatStore,
    staged: Vec<Write>,
}

impl MemoryChatTransaction {
    /// Committed state with this transaction's own writes applied
    fn view(&self) -> Result<Tables, RepositoryError> {
        let mut tables = self.store.lock_tables()?.clone();
        for write in &self.staged {
            write.clone().apply(&mut tables);
        }
        Ok(tables)
    }
}

#[async_trait]
impl ChatTransaction for MemoryChatTransaction {
    async fn create_conversation(
        &mut self,
        conversation: &NewConversation,
    ) -> Result<i64, RepositoryError> {
        let id = self.store.next_conversation_id()?;
        self.staged.push(Write::Conversation(Conversation {
            id,
            first_user_id: conversation.first_user_id,
            second_user_id: conversation.second_user_id,
            last_message: String::new(),
            updated_at: conversation.updated_at,
        }));
        Ok(id)
    }

    async fn fetch_conversation(
        &mut self,
        id: i64,
    ) -> Result<Option<Conversation>, RepositoryError> {
        Ok(self.view()?.conversations.remove(&id))
    }

    async fn fetch_user_conversations(
        &mut self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        let mut conversations: Vec<Conversation> = self
            .view()?
            .conversations
            .into_values()
            .filter(|c| c.has_participant(user_id))
            .collect();
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));

        Ok(window(conversations, limit, offset))
    }

    async fn update_conversation_summary(
        &mut self,
        id: i64,
        text: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        if self.store.faults.summary_updates.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "injected summary update fault".to_string(),
            ));
        }
        if !self.view()?.conversations.contains_key(&id) {
            return Ok(0);
        }

        self.staged.push(Write::Summary {
            id,
            text: text.to_string(),
            updated_at,
        });
        Ok(1)
    }

    async fn create_message(&mut self, message: &NewMessage) -> Result<i64, RepositoryError> {
        if self.store.faults.message_inserts.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "injected message insert fault".to_string(),
            ));
        }
        if !self.view()?.conversations.contains_key(&message.chat_id) {
            return Err(RepositoryError::NotFound);
        }

        let id = self.store.next_message_id()?;
        self.staged
            .push(Write::Message(message.clone().into_message(id)));
        Ok(id)
    }

    async fn fetch_messages_by_conversation(
        &mut self,
        conversation_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, RepositoryError> {
        let mut messages: Vec<Message> = self
            .view()?
            .messages
            .into_iter()
            .filter(|m| m.chat_id == conversation_id)
            .collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(window(messages, limit, offset))
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let MemoryChatTransaction { store, staged } = *self;
        let mut tables = store.lock_tables()?;
        for write in staged {
            write.apply(&mut tables);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError> {
        Ok(())
    }
}

fn window<T>(rows: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    rows.into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}
