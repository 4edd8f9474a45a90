//! Shared primitives for all Rust crates in Roadwatch.

#![forbid(unsafe_code)]

/// Per-field validation error mapping.
pub mod field_errors;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use field_errors::FieldErrors;

/// Result type used across Roadwatch crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// A draft was rejected by the form validator.
    #[error("invalid fields: {0}")]
    InvalidFields(FieldErrors),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A local mutation could not be mirrored to the backend.
    #[error("remote sync failed: {0}")]
    RemoteSync(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}
