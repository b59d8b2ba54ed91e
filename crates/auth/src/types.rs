use serde::{Deserialize, Serialize};

/// The acting user as reported by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthIdentity {
    pub user_id: i64,
    pub email: String,
    #[serde(default)]
    pub name: String,
}
