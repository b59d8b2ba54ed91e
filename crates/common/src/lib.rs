//! Shared utilities, configuration, and error handling for Parley
//!
//! This crate provides common functionality used across the Parley service:
//! - Configuration management following 12-factor principles
//! - Error taxonomy and HTTP rendering
//! - Repository (gateway) error type
//! - Pagination and validated JSON extractors

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;

pub use config::{Config, WriteMode};
pub use db::RepositoryError;
pub use error::{Error, Result};
pub use extractors::{Pagination, ValidatedJson};
