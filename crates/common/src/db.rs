//! Shared database types for Parley
//!
//! This module provides the error type returned by persistence gateway
//! implementations. Services wrap it into [`Error::Persistence`] together
//! with the name of the logical operation that failed.

use crate::error::Error;
use thiserror::Error;

/// Database-specific error types
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Record already exists")]
    AlreadyExists,

    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    /// Attach the logical operation name, producing an application error
    pub fn into_error(self, op: &'static str) -> Error {
        match self {
            RepositoryError::NotFound => Error::NotFound(format!("{}: record not found", op)),
            other => Error::Persistence { op, source: other },
        }
    }
}
