//! Domain entities for the Conversations domain
//!
//! A conversation is a two-party chat with a mutable summary (last message
//! text and timestamp). Messages are immutable once stored. Validation of
//! user-supplied fields lives in the `new` constructors so that REST and
//! WebSocket input go through the same rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parley_common::{Error, Result};

/// Maximum message text length in characters (after trimming)
pub const MAX_MESSAGE_LENGTH: usize = 4096;

/// Conversation entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: i64,
    pub first_user_id: i64,
    pub second_user_id: i64,
    /// Empty until the first message is recorded
    pub last_message: String,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn has_participant(&self, user_id: i64) -> bool {
        self.first_user_id == user_id || self.second_user_id == user_id
    }
}

/// Validated input for creating a conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConversation {
    pub first_user_id: i64,
    pub second_user_id: i64,
    pub updated_at: DateTime<Utc>,
}

impl NewConversation {
    pub fn new(first_user_id: i64, second_user_id: i64) -> Result<Self> {
        if first_user_id <= 0 || second_user_id <= 0 {
            return Err(Error::Validation(
                "Participant ids must be positive".to_string(),
            ));
        }
        if first_user_id == second_user_id {
            return Err(Error::Validation(
                "A conversation needs two distinct participants".to_string(),
            ));
        }

        Ok(Self {
            first_user_id,
            second_user_id,
            updated_at: Utc::now(),
        })
    }
}

/// Message entity, also the outbound WebSocket frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    pub chat_id: i64,
    pub sender: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Validated input for recording a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub chat_id: i64,
    pub sender: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl NewMessage {
    /// Trims `text` and stamps the message with the current UTC time.
    pub fn new(chat_id: i64, sender: i64, text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Validation(
                "Message text cannot be empty or whitespace-only".to_string(),
            ));
        }
        if text.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(Error::Validation(format!(
                "Message text must be at most {} characters",
                MAX_MESSAGE_LENGTH
            )));
        }

        Ok(Self {
            chat_id,
            sender,
            text: text.to_string(),
            created_at: Utc::now(),
        })
    }

    pub fn into_message(self, id: i64) -> Message {
        Message {
            id,
            chat_id: self.chat_id,
            sender: self.sender,
            text: self.text,
            created_at: self.created_at,
        }
    }
}

/// Inbound WebSocket frame.
///
/// `chat_id` is accepted for compatibility but the connection's own
/// conversation always wins. A missing or null `text` decodes as empty and
/// is rejected later as blank; only undecodable JSON is a protocol error.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageFrame {
    #[serde(default)]
    pub chat_id: Option<i64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub text: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl MessageFrame {
    pub fn decode(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::Protocol(format!("Malformed frame: {}", e)))
    }
}
