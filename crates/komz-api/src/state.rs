//! Shared handler state.

use std::sync::Arc;

use komz_client::{ChatProvider, GeminiClient, RetellClient, VoiceCallProvider};
use komz_core::{GatewayConfig, MemoryStore, RateLimiter};

use crate::Result;

/// Everything the handlers need. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Voice-call provisioning.
    pub voice: Arc<dyn VoiceCallProvider>,
    /// Chat reply generation.
    pub chat: Arc<dyn ChatProvider>,
    /// Per-visitor chat throttling.
    pub limiter: Arc<RateLimiter>,
    /// Agent used when a call request names none.
    pub default_agent_id: Option<String>,
}

impl AppState {
    /// Wires up state from explicit parts.
    pub fn new(
        voice: Arc<dyn VoiceCallProvider>,
        chat: Arc<dyn ChatProvider>,
        limiter: Arc<RateLimiter>,
        default_agent_id: Option<String>,
    ) -> Self {
        Self {
            voice,
            chat,
            limiter,
            default_agent_id,
        }
    }

    /// Builds the production state: real provider clients and an in-memory limiter.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let voice = RetellClient::new(&config.retell)?;
        let chat = GeminiClient::new(&config.gemini)?;
        let limiter = RateLimiter::new(
            MemoryStore::new(),
            config.rate_limit.max_messages,
            config.rate_limit.window(),
        );

        if config.retell.api_key.is_none() {
            tracing::warn!("RETELL_API_KEY is not set; /create-web-call will fail");
        }
        if config.gemini.api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set; /chat will fail");
        }

        Ok(Self::new(
            Arc::new(voice),
            Arc::new(chat),
            Arc::new(limiter),
            config.retell.default_agent_id.clone(),
        ))
    }
}
