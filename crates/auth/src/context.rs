//! Request-scoped view of the authenticated user

use crate::types::AuthIdentity;

/// Represents an authenticated user context
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: AuthIdentity,
}

impl AuthContext {
    pub fn new(user: AuthIdentity) -> Self {
        Self { user }
    }

    pub fn user_id(&self) -> i64 {
        self.user.user_id
    }

    /// Whether the user is one of the two given participants
    pub fn is_participant(&self, first_user_id: i64, second_user_id: i64) -> bool {
        self.user.user_id == first_user_id || self.user.user_id == second_user_id
    }
}
