//! Conversations domain: two-party chats, messages, live rooms
//!
//! Messages arrive over REST or over a WebSocket scoped to one
//! conversation. Every accepted message goes through [`MessageService`]
//! and is then fanned out to the conversation's live [`Room`], if any.

pub mod api;
pub mod domain;
pub mod ingress;
pub mod repository;
pub mod rooms;
pub mod service;

// Re-export domain types at the crate root for convenience
pub use domain::entities::{Conversation, Message, MessageFrame, NewConversation, NewMessage};

// Re-export repository types
pub use repository::{ChatStore, ChatTransaction, MemoryChatStore, PgChatStore};

// Re-export services and rooms
pub use rooms::{ConnectionId, Membership, Room, RoomRegistry};
pub use service::{ConversationService, MessageService};

// Re-export API types
pub use api::routes;
pub use api::ConversationsState;
