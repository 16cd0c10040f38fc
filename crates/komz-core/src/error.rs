//! Error types for komz-core

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors that can occur in komz-core.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// Input validation error
    #[error("Validation error: {message}")]
    Validation {
        /// Field that failed validation
        field: Option<String>,
        /// What went wrong
        message: String,
    },

    /// The caller has used up its demo messages for the current window.
    #[error("Rate limit exceeded: {limit} messages per window, retry in {}s", .retry_after.as_secs())]
    RateLimited {
        /// Messages allowed per window
        limit: u32,
        /// Time until the window resets
        retry_after: Duration,
    },

    /// I/O error without path context
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error on a specific file
    #[error("I/O error on {}: {source}", .path.display())]
    IoWithPath {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A persisted state file exists but cannot be parsed.
    #[error("Unreadable state file {}: {message} (delete it to reset)", .path.display())]
    CorruptState {
        /// File that failed to parse
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for komz-core operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Creates a new validation error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Error::Validation {
            field: None,
            message: message.into(),
        }
    }

    /// Creates a new validation error with a field name.
    pub fn validation_field<F, M>(field: F, message: M) -> Self
    where
        F: Into<String>,
        M: Into<String>,
    {
        Error::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Wraps an I/O error with the path it happened on.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Error::IoWithPath {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Whether the error was caused by the caller rather than the gateway.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Validation { .. } | Error::RateLimited { .. })
    }
}
