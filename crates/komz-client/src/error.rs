//! Error types for komz-client

use thiserror::Error;

/// Result type alias for komz-client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in komz-client
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from komz-core
    #[error("Core error: {0}")]
    Core(#[from] komz_core::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("{provider} returned HTTP {status}: {message}")]
    Upstream {
        /// Provider name
        provider: &'static str,
        /// HTTP status code
        status: u16,
        /// Provider's error message, or the raw body
        message: String,
    },

    /// No API key configured for a provider.
    #[error("API key is missing for {provider}. Please set {env_var} in your .env.local file.")]
    MissingApiKey {
        /// Provider name
        provider: &'static str,
        /// Variable that supplies the key
        env_var: &'static str,
    },

    /// Neither the request nor the configuration names a voice agent.
    #[error("Agent ID is required")]
    MissingAgentId,

    /// The provider answered with a body we could not interpret.
    #[error("Unexpected response from {provider}: {message}")]
    InvalidResponse {
        /// Provider name
        provider: &'static str,
        /// What was wrong
        message: String,
    },
}

impl Error {
    /// Builds an [`Error::Upstream`] from a failed response body.
    ///
    /// Both providers wrap failures as `{"error": {"message": ...}}` or
    /// `{"error_message": ...}`; anything else is passed through raw.
    pub fn upstream(provider: &'static str, status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.pointer("/error/message")
                    .or_else(|| v.get("error_message"))
                    .or_else(|| v.get("error"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| body.trim().to_string());
        Error::Upstream {
            provider,
            status,
            message,
        }
    }
}
