//! Concrete authentication backend
//!
//! Wraps the configured [`IdentityService`]. Domain states expose this via
//! `FromRef`:
//! ```ignore
//! impl FromRef<MyDomainState> for AuthBackend {
//!     fn from_ref(state: &MyDomainState) -> Self {
//!         state.auth.clone()
//!     }
//! }
//! ```

use std::sync::Arc;

use crate::context::AuthContext;
use crate::error::AuthError;
use crate::IdentityService;

#[derive(Clone)]
pub struct AuthBackend {
    identity: Arc<dyn IdentityService>,
}

impl AuthBackend {
    pub fn new(identity: Arc<dyn IdentityService>) -> Self {
        Self { identity }
    }

    /// Resolve a raw token into an authenticated context.
    pub(crate) async fn authenticate(&self, token: &str) -> Result<AuthContext, AuthError> {
        let user = self.identity.current_user(token).await.map_err(|e| {
            tracing::warn!(op = "middleware.auth.authenticate", error = %e, "Unauthorized");
            AuthError::from(e)
        })?;

        Ok(AuthContext::new(user))
    }
}

impl std::fmt::Debug for AuthBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthBackend").finish_non_exhaustive()
    }
}
