//! # komz-client
//!
//! Clients for the third-party services behind the demo widgets:
//! - [`RetellClient`] provisions browser voice calls
//! - [`GeminiClient`] generates chat replies
//!
//! Both sit behind small provider traits so the gateway can be exercised
//! against the doubles in [`mock`].

#![forbid(unsafe_code)]

pub mod error;
pub mod gemini;
pub mod mock;
pub mod provider;
pub mod retell;

pub use error::{Error, Result};
pub use gemini::GeminiClient;
pub use provider::{ChatProvider, VoiceCallProvider, WebCallRequest};
pub use retell::RetellClient;
