//! Parley application composition root
//!
//! Wires configuration, storage, identity and the conversations domain into
//! a single router.

use axum::http::HeaderValue;
use axum::Router;
use parley_auth::{IdentityConfig, IdentityServiceFactory};
use parley_common::Config;
use parley_conversations::{ChatStore, ConversationsState, PgChatStore};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Create the main application router with all routes
pub async fn create_app(config: Config, pool: PgPool) -> Result<Router, anyhow::Error> {
    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    let store: Arc<dyn ChatStore> = Arc::new(PgChatStore::new(pool));

    let identity = IdentityServiceFactory::create(IdentityConfig::from_config(&config))?;

    let state = ConversationsState::new(store, Arc::from(identity), config.message_write_mode);
    tracing::info!(write_mode = %state.messages.mode(), "Message write pipeline configured");

    Ok(build_router(state).layer(cors_layer(&config.cors_allowed_origins)?))
}

/// Compose domain routes with shared infrastructure routes
pub fn build_router(state: ConversationsState) -> Router {
    Router::new()
        .route("/health", axum::routing::get(health_check))
        .route(
            "/",
            axum::routing::get(|| async { "Parley API v0.0.1-SNAPSHOT" }),
        )
        .merge(parley_conversations::routes().with_state(state))
}

/// CORS policy from a comma separated origin list, `*` allowing any origin
pub fn cors_layer(allowed_origins: &str) -> Result<CorsLayer, anyhow::Error> {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if allowed_origins.trim() == "*" {
        return Ok(base.allow_origin(Any));
    }

    let origins = allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|e| anyhow::anyhow!("Invalid CORS origin {}: {}", origin, e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(base.allow_origin(origins))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
