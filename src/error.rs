//! Error types for catalog operations.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
/// One rejected draft field.
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors surfaced by catalog operations.
///
/// Variants carry rendered messages only, so views can keep the last error as
/// displayable state and clone it freely.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// Network failure, timeout, or a response body that is not JSON.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Draft rejected locally before any request was sent.
    #[error("validation failed: {}", join_fields(.errors))]
    Validation { errors: Vec<FieldError> },

    /// Backend answered with a non-success status.
    #[error("remote rejected request ({status}): {message}")]
    RemoteRejection { status: u16, message: String },
}

impl CatalogError {
    pub fn transport(message: impl Into<String>) -> Self {
        CatalogError::Transport {
            message: message.into(),
        }
    }

    /// Text suitable for showing to a user.
    ///
    /// Remote messages are passed through verbatim; transport failures collapse
    /// to `fallback` since their details are only useful in logs.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            CatalogError::Transport { .. } => fallback.to_string(),
            CatalogError::Validation { errors } => join_fields(errors),
            CatalogError::RemoteRejection { message, .. } if !message.trim().is_empty() => {
                message.clone()
            }
            CatalogError::RemoteRejection { .. } => fallback.to_string(),
        }
    }

    /// Field-level errors for validation failures; empty otherwise.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            CatalogError::Validation { errors } => errors,
            _ => &[],
        }
    }
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(FieldError::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
