//! Identity collaborator HTTP client
//!
//! POSTs `{token, app_id}` to `{base_url}/v1/current_user` and reads back
//! the acting user.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;

use crate::{AuthIdentity, IdentityError, IdentityService};

#[derive(Serialize)]
struct CurrentUserRequest<'a> {
    token: &'a str,
    app_id: i32,
}

/// HTTP client for the identity collaborator.
pub struct HttpIdentityClient {
    http: reqwest::Client,
    current_user_url: String,
    app_id: i32,
}

impl HttpIdentityClient {
    pub fn new(base_url: &str, app_id: i32, timeout: Duration) -> Result<Self, IdentityError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IdentityError::Configuration(e.to_string()))?;

        Ok(Self {
            http,
            current_user_url: format!("{}/v1/current_user", base_url.trim_end_matches('/')),
            app_id,
        })
    }
}

#[async_trait::async_trait]
impl IdentityService for HttpIdentityClient {
    async fn current_user(&self, token: &str) -> Result<AuthIdentity, IdentityError> {
        const OP: &str = "auth.identity.current_user";

        let response = self
            .http
            .post(&self.current_user_url)
            .json(&CurrentUserRequest {
                token,
                app_id: self.app_id,
            })
            .send()
            .await
            .map_err(|e| {
                tracing::error!(op = OP, error = %e, "Identity request failed");
                IdentityError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::debug!(op = OP, status = %status, "Token rejected");
            return Err(IdentityError::Rejected);
        }
        if !status.is_success() {
            tracing::error!(op = OP, status = %status, "Identity provider returned an error");
            return Err(IdentityError::Unavailable(format!(
                "identity provider returned {}",
                status
            )));
        }

        let identity: AuthIdentity = response
            .json()
            .await
            .map_err(|e| IdentityError::Unavailable(format!("malformed identity body: {}", e)))?;

        tracing::debug!(op = OP, user_id = identity.user_id, "User from identity provider");
        Ok(identity)
    }
}
