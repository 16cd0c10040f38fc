//! # komz-cli
//!
//! Operator CLI for the Komz demo gateway:
//! - `komz serve` runs the HTTP gateway
//! - `komz chat` talks to the model from a terminal, under the demo quota
//! - `komz call` provisions a voice call for testing an agent
//! - `komz config` inspects and edits the config file

#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod chat;
pub mod cli;
pub mod commands;
pub mod config_handlers;
pub mod error;

pub use error::{Error, Result};
