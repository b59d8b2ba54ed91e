//! Transactional services over the persistence gateway
//!
//! Each public operation is one logical unit: begin, run gateway commands,
//! commit on success, roll back on any failure. Failures are logged with the
//! operation name and returned to the caller; nothing is retried here.

mod conversations;
mod messages;

pub use conversations::ConversationService;
pub use messages::MessageService;

use parley_common::{Error, RepositoryError, Result};

use crate::repository::{ChatStore, ChatTransaction};

pub(crate) async fn begin(
    store: &dyn ChatStore,
    op: &'static str,
) -> Result<Box<dyn ChatTransaction>> {
    store.begin().await.map_err(|e| {
        tracing::error!(op, error = %e, "Failed to start transaction");
        e.into_error(op)
    })
}

/// Commit on `Ok`, roll back on `Err`.
pub(crate) async fn finish<T>(
    tx: Box<dyn ChatTransaction>,
    op: &'static str,
    result: std::result::Result<T, RepositoryError>,
) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit().await.map_err(|e| {
                tracing::error!(op, error = %e, "Failed to commit transaction");
                e.into_error(op)
            })?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(op, error = %rollback_err, "Failed to roll back transaction");
            }
            Err(log_failure(op, err.into_error(op)))
        }
    }
}

pub(crate) fn log_failure(op: &'static str, err: Error) -> Error {
    match &err {
        Error::NotFound(_) | Error::Validation(_) => {
            tracing::debug!(op, error = %err, "Operation rejected")
        }
        _ => tracing::error!(op, error = %err, "Operation failed"),
    }
    err
}
