//! Provider traits the gateway talks to.

use async_trait::async_trait;
use komz_core::Message;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Body of a web-call creation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebCallRequest {
    /// Voice agent to connect the visitor to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

impl WebCallRequest {
    /// Request for a specific agent.
    pub fn for_agent(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: Some(agent_id.into()),
        }
    }

    /// The requested agent, or `fallback` when none (or a blank one) was given.
    pub fn resolve_agent<'a>(&'a self, fallback: Option<&'a str>) -> Option<&'a str> {
        self.agent_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .or(fallback.filter(|id| !id.trim().is_empty()))
    }
}

/// Provisions browser voice calls.
#[async_trait]
pub trait VoiceCallProvider: Send + Sync {
    /// Creates a web call for `agent_id` and returns the provider's JSON
    /// response untouched (it carries the `access_token` the browser SDK needs).
    async fn create_web_call(&self, agent_id: &str) -> Result<serde_json::Value>;
}

/// Generates chat replies.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Produces the model's reply to `prompt` given the earlier `history`.
    ///
    /// `Ok(None)` means the model answered without any text.
    async fn generate(&self, history: &[Message], prompt: &str) -> Result<Option<String>>;
}
