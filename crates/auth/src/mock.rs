//! Mock identity service
//!
//! Tokens registered with [`MockIdentityService::with_user`] resolve to
//! their identity. Unregistered tokens of the form `mock-<user_id>` resolve
//! to a synthetic identity so local runs need no identity collaborator.
//! Everything else is rejected.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::{AuthIdentity, IdentityError, IdentityService};

const SYNTHETIC_PREFIX: &str = "mock-";

#[derive(Debug, Clone, Default)]
pub struct MockIdentityService {
    users: Arc<Mutex<HashMap<String, AuthIdentity>>>,
    lookups: Arc<Mutex<Vec<String>>>,
}

impl MockIdentityService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token for a user
    pub fn with_user(self, token: &str, user_id: i64) -> Self {
        self.users
            .lock()
            .expect("users lock poisoned")
            .insert(
                token.to_string(),
                AuthIdentity {
                    user_id,
                    email: format!("user{}@parley.local", user_id),
                    name: format!("User {}", user_id),
                },
            );
        self
    }

    /// Tokens looked up so far, in order
    pub fn recorded_lookups(&self) -> Vec<String> {
        self.lookups.lock().expect("lookups lock poisoned").clone()
    }

    fn synthetic(token: &str) -> Option<AuthIdentity> {
        let user_id: i64 = token.strip_prefix(SYNTHETIC_PREFIX)?.parse().ok()?;
        (user_id > 0).then(|| AuthIdentity {
            user_id,
            email: format!("user{}@parley.local", user_id),
            name: format!("User {}", user_id),
        })
    }
}

#[async_trait::async_trait]
impl IdentityService for MockIdentityService {
    async fn current_user(&self, token: &str) -> Result<AuthIdentity, IdentityError> {
        self.lookups
            .lock()
            .map_err(|_| IdentityError::Unavailable("mock state poisoned".to_string()))?
            .push(token.to_string());

        let registered = self
            .users
            .lock()
            .map_err(|_| IdentityError::Unavailable("mock state poisoned".to_string()))?
            .get(token)
            .cloned();

        registered
            .or_else(|| Self::synthetic(token))
            .ok_or(IdentityError::Rejected)
    }
}
