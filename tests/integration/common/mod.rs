//! Common test utilities and fixtures for integration tests
//!
//! Everything runs against the in-memory chat store and the mock identity
//! service unless a test opts into Postgres through `TEST_DATABASE_URL`.

use std::env;
use std::sync::{Arc, Once};

use axum::body::Body;
use axum::http::{Method, Request};
use axum::Router;
use futures_util::{stream, Stream};
use serde_json::Value;

use parley_auth::mock::MockIdentityService;
use parley_common::{Pagination, WriteMode};
use parley_conversations::ingress::Ingress;
use parley_conversations::{
    ChatStore, Conversation, ConversationsState, Membership, MemoryChatStore, Message,
    NewConversation,
};

static INIT: Once = Once::new();

/// Postgres URL for store tests, if one is configured
pub fn test_database_url() -> Option<String> {
    INIT.call_once(|| {
        dotenvy::from_filename(".env.test").ok();
        dotenvy::dotenv().ok();
    });

    env::var("TEST_DATABASE_URL").ok()
}

/// Test application over the in-memory store
pub struct TestApp {
    pub state: ConversationsState,
    pub store: MemoryChatStore,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_mode(WriteMode::Atomic)
    }

    pub fn with_mode(mode: WriteMode) -> Self {
        let store = MemoryChatStore::new();
        let shared: Arc<dyn ChatStore> = Arc::new(store.clone());
        let state = ConversationsState::new(shared, Arc::new(MockIdentityService::new()), mode);
        Self { state, store }
    }

    /// Full application router bound to this app's state
    pub fn test_router(&self) -> Router {
        parley_app::build_router(self.state.clone())
    }

    pub async fn create_conversation(&self, first: i64, second: i64) -> i64 {
        self.state
            .conversations
            .create(NewConversation::new(first, second).unwrap())
            .await
            .unwrap()
    }

    pub async fn conversation(&self, id: i64) -> Conversation {
        self.state.conversations.get(id).await.unwrap()
    }

    pub async fn history(&self, conversation_id: i64) -> Vec<Message> {
        self.state
            .messages
            .history(conversation_id, Pagination::new(100, 0))
            .await
            .unwrap()
    }

    /// Ingress loop for `member`, acting as `sender`
    pub fn ingress(&self, conversation_id: i64, sender: i64, member: &Membership) -> Ingress {
        Ingress {
            conversation_id,
            sender,
            connection: member.connection,
            messages: self.state.messages.clone(),
            room: member.room.clone(),
        }
    }
}

/// Mock identity token for a user id
pub fn token_for(user_id: i64) -> String {
    format!("mock-{}", user_id)
}

/// Inbound frames as a connection would deliver them
pub fn text_frames(raw: &[&str]) -> impl Stream<Item = Result<String, String>> {
    stream::iter(
        raw.iter()
            .map(|r| Ok::<String, String>(r.to_string()))
            .collect::<Vec<_>>(),
    )
}

/// Build an authenticated request
pub fn authed_request(method: Method, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token));

    if let Some(b) = body {
        builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&b).unwrap()))
            .unwrap()
    } else {
        builder.body(Body::empty()).unwrap()
    }
}

/// Parse response body as JSON Value
pub async fn parse_body(response: axum::http::Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
