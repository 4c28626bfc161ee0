//! Domain-level error types for sig-prune-contact.
//!
//! All errors are typed with `thiserror`. Each variant belongs to one of the
//! failure classes the workflow distinguishes when deciding the exit status.

use std::path::PathBuf;
use thiserror::Error;

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed user input (contact identifier, flag value).
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Unknown export format requested.
    #[error("Invalid format: {name}. Must be one of: json, md, html")]
    InvalidFormat { name: String },

    /// The conversation source is missing or not configured.
    #[error("Conversation source unavailable: {message}")]
    SourceUnavailable { message: String },

    /// The conversation source ran but reported an error.
    #[error("Conversation source error: {message}")]
    SourceFailed { message: String },

    /// No contact matches the requested identifier.
    #[error("Contact not found: {identifier}")]
    ContactNotFound { identifier: String },

    /// Deletion attempted without a valid export manifest for the contact.
    #[error("Refusing to delete: {reason} at {}", path.display())]
    GuardViolation { path: PathBuf, reason: String },

    /// The operator ended input at a prompt or interrupted the run.
    #[error("Cancelled by user")]
    Cancelled,

    /// Failed to open or query the message database.
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// JSON (de)serialization failed.
    #[error("JSON error: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Create a database error from rusqlite error.
    pub fn database(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a source-unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            message: message.into(),
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
