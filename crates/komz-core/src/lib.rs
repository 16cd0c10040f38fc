//! Komz Core: shared types, errors and policies for the demo gateway.
//!
//! This crate has no internal Komz dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`chat`]: Chat roles, messages, and in-memory conversations
//! - [`config`]: Gateway configuration (TOML file, `.env`, environment)
//! - [`error`]: Error types and Result alias
//! - [`rate_limit`]: Per-visitor demo message throttling
//! - [`sanitize`]: Prompt cleanup applied before anything leaves the gateway

pub mod chat;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod sanitize;

// Re-export key types at crate root for convenience
pub use chat::{Conversation, Message, MessageId, Role};
pub use config::GatewayConfig;
pub use error::{Error, Result};
pub use rate_limit::{
    JsonFileStore, MemoryStore, RateLimitState, RateLimitStore, RateLimiter, Reservation,
};
pub use sanitize::sanitize_input;
