//! Retell voice-agent client.
//!
//! Only call provisioning happens server-side. Audio transport and the call
//! itself run between the visitor's browser and Retell using the returned
//! access token.

use std::time::Duration;

use async_trait::async_trait;
use komz_core::config::RetellConfig;
use serde::Serialize;

use crate::provider::VoiceCallProvider;
use crate::{Error, Result};

const PROVIDER: &str = "retell";

/// Upper bound for one provisioning request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct CreateWebCallBody<'a> {
    agent_id: &'a str,
}

/// Client for Retell's call provisioning API.
#[derive(Debug, Clone)]
pub struct RetellClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl RetellClient {
    /// Creates a client from configuration.
    pub fn new(config: &RetellConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_http_client(http, config))
    }

    /// Creates a client that reuses an existing HTTP client.
    pub fn with_http_client(http: reqwest::Client, config: &RetellConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or(Error::MissingApiKey {
            provider: PROVIDER,
            env_var: "RETELL_API_KEY",
        })
    }
}

#[async_trait]
impl VoiceCallProvider for RetellClient {
    async fn create_web_call(&self, agent_id: &str) -> Result<serde_json::Value> {
        let api_key = self.api_key()?;
        let url = format!("{}/v2/create-web-call", self.base_url);

        tracing::debug!(agent_id, "Creating web call");

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&CreateWebCallBody { agent_id })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::upstream(PROVIDER, status.as_u16(), &body));
        }

        let call: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| Error::InvalidResponse {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        if let Some(call_id) = call.get("call_id").and_then(|v| v.as_str()) {
            tracing::info!(call_id, agent_id, "Web call created");
        }

        Ok(call)
    }
}
