//! Conversations domain state and auth backend integration

use crate::repository::ChatStore;
use crate::rooms::RoomRegistry;
use crate::service::{ConversationService, MessageService};
use axum::extract::FromRef;
use parley_auth::{AuthBackend, IdentityService};
use parley_common::WriteMode;
use std::sync::Arc;

/// Application state for the Conversations domain
#[derive(Clone)]
pub struct ConversationsState {
    pub conversations: ConversationService,
    pub messages: MessageService,
    pub rooms: Arc<RoomRegistry>,
    pub auth: AuthBackend,
}

impl ConversationsState {
    pub fn new(
        store: Arc<dyn ChatStore>,
        identity: Arc<dyn IdentityService>,
        write_mode: WriteMode,
    ) -> Self {
        Self {
            conversations: ConversationService::new(store.clone()),
            messages: MessageService::new(store, write_mode),
            rooms: Arc::new(RoomRegistry::new()),
            auth: AuthBackend::new(identity),
        }
    }
}

impl FromRef<ConversationsState> for AuthBackend {
    fn from_ref(state: &ConversationsState) -> Self {
        state.auth.clone()
    }
}
