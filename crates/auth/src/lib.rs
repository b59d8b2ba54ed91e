//! Authentication for the Parley API
//!
//! The service does not own users. Every request presents a bearer token
//! which is resolved against the external identity collaborator through
//! an [`IdentityService`]. Axum extractors work with any domain state that
//! implements `FromRef<S>` for [`AuthBackend`].

mod backend;
pub mod client;
mod context;
mod error;
mod extractors;
pub mod mock;
mod token;
mod types;

pub use backend::AuthBackend;
pub use context::AuthContext;
pub use error::{AuthError, IdentityError};
pub use extractors::AuthUser;
pub use types::AuthIdentity;

use parley_common::Config;
use std::time::Duration;

/// Identity collaborator configuration.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Identity provider (http, mock)
    pub provider: String,
    /// Base URL of the identity collaborator
    pub base_url: Option<String>,
    /// Application id presented alongside every token
    pub app_id: i32,
    /// Upper bound on a single identity call
    pub timeout: Duration,
}

impl IdentityConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            provider: config.identity_provider.clone(),
            base_url: config.identity_url.clone(),
            app_id: config.identity_app_id,
            timeout: Duration::from_secs(config.identity_timeout_secs),
        }
    }
}

/// Resolves a bearer token into the acting user.
#[async_trait::async_trait]
pub trait IdentityService: Send + Sync {
    async fn current_user(&self, token: &str) -> Result<AuthIdentity, IdentityError>;
}

/// Factory for creating IdentityService implementations.
pub struct IdentityServiceFactory;

impl IdentityServiceFactory {
    /// Create an IdentityService based on configuration.
    pub fn create(config: IdentityConfig) -> Result<Box<dyn IdentityService>, IdentityError> {
        match config.provider.as_str() {
            "http" => {
                let base_url = config.base_url.clone().ok_or_else(|| {
                    IdentityError::Configuration(
                        "IDENTITY_URL is required for the http identity provider".to_string(),
                    )
                })?;
                tracing::info!(base_url = %base_url, app_id = config.app_id, "Creating HTTP identity client");
                Ok(Box::new(client::HttpIdentityClient::new(
                    &base_url,
                    config.app_id,
                    config.timeout,
                )?))
            }
            "mock" => {
                tracing::info!("Creating mock identity service");
                Ok(Box::new(mock::MockIdentityService::new()))
            }
            provider => Err(IdentityError::Configuration(format!(
                "Unknown identity provider: {}. Supported providers: http, mock",
                provider
            ))),
        }
    }
}
