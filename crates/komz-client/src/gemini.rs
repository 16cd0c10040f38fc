//! Gemini generative-language client.
//!
//! Talks to the `generateContent` REST endpoint. Every request carries the
//! whole conversation, since the API keeps no session state.

use std::time::Duration;

use async_trait::async_trait;
use komz_core::config::GeminiConfig;
use komz_core::{Message, Role};
use serde::{Deserialize, Serialize};

use crate::provider::ChatProvider;
use crate::{Error, Result};

const PROVIDER: &str = "gemini";

/// Upper bound for one generation request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Joined text parts of the first candidate.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let texts: Vec<&str> = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }
}

/// Maps chat history onto Gemini turns. Anything not from the visitor is
/// presented as the model's own turn.
fn to_contents(history: &[Message], prompt: &str) -> Vec<Content> {
    history
        .iter()
        .map(|msg| {
            let role = match msg.role {
                Role::User => "user",
                Role::Model | Role::System => "model",
            };
            Content::text(Some(role), &msg.content)
        })
        .chain(std::iter::once(Content::text(Some("user"), prompt)))
        .collect()
}

// ============================================================================
// GeminiClient
// ============================================================================

/// Client for Gemini's `generateContent` API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Creates a client from configuration.
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_http_client(http, config))
    }

    /// Creates a client that reuses an existing HTTP client.
    pub fn with_http_client(http: reqwest::Client, config: &GeminiConfig) -> Self {
        Self {
            http,
            config: config.clone(),
        }
    }

    /// Model requests are sent to.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn build_request(&self, history: &[Message], prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: to_contents(history, prompt),
            system_instruction: Content::text(None, &self.config.system_instruction),
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                top_k: self.config.top_k,
            },
        }
    }
}

#[async_trait]
impl ChatProvider for GeminiClient {
    async fn generate(&self, history: &[Message], prompt: &str) -> Result<Option<String>> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(Error::MissingApiKey {
                provider: PROVIDER,
                env_var: "GEMINI_API_KEY",
            })?;

        let request = self.build_request(history, prompt);
        tracing::debug!(
            model = %self.config.model,
            turns = request.contents.len(),
            "Requesting chat completion"
        );

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::upstream(PROVIDER, status.as_u16(), &body));
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| Error::InvalidResponse {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        Ok(parsed.text())
    }
}
