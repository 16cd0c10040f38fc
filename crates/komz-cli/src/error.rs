//! Error types for komz-cli

use thiserror::Error;

/// Result type alias for komz-cli operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in komz-cli
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from komz-core
    #[error("Core error: {0}")]
    Core(#[from] komz_core::Error),

    /// Error from komz-client
    #[error("Client error: {0}")]
    Client(#[from] komz_client::Error),

    /// Error from komz-api
    #[error("Server error: {0}")]
    Api(#[from] komz_api::Error),

    /// Terminal I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
