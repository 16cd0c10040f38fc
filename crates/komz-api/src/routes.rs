//! Request handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use chrono::{DateTime, Utc};
use komz_client::WebCallRequest;
use komz_core::{Message, sanitize_input};
use serde::{Deserialize, Serialize};

use crate::client_key::ClientKey;
use crate::{ApiError, AppState};

// ============================================================================
// Voice calls
// ============================================================================

/// `POST /create-web-call`
///
/// The body is optional: an empty body and `{}` both fall back to the
/// configured default agent. The provider's JSON is relayed untouched.
pub async fn create_web_call(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let request: WebCallRequest = if body.iter().all(u8::is_ascii_whitespace) {
        WebCallRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))?
    };

    let agent_id = request
        .resolve_agent(state.default_agent_id.as_deref())
        .ok_or(komz_client::Error::MissingAgentId)?;

    match state.voice.create_web_call(agent_id).await {
        Ok(call) => Ok(Json(call)),
        Err(err) => {
            tracing::error!(agent_id, error = %err, "Error creating web call");
            Err(err.into())
        }
    }
}

// ============================================================================
// Chat
// ============================================================================

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Conversation so far, oldest first.
    #[serde(default)]
    pub history: Vec<Message>,
    /// The visitor's new message.
    pub prompt: String,
}

/// Reply to `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The model's message.
    pub message: Message,
}

/// `POST /chat`
///
/// Runs behind [`RateLimitLayer`](crate::RateLimitLayer), which charges the
/// caller only when this handler succeeds.
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let prompt = sanitize_input(&request.prompt);
    if prompt.is_empty() {
        return Err(komz_core::Error::validation_field("prompt", "Message must not be empty").into());
    }

    match state.chat.generate(&request.history, &prompt).await {
        Ok(reply) => Ok(Json(ChatResponse {
            message: Message::model_reply(reply),
        })),
        Err(err) => {
            tracing::error!(error = %err, "Error generating chat reply");
            Err(err.into())
        }
    }
}

/// Reply to `GET /chat/quota`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaResponse {
    /// Messages allowed per window.
    pub limit: u32,
    /// Messages left in the current window.
    pub remaining: u32,
    /// When the current window resets; absent before the first message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resets_at: Option<DateTime<Utc>>,
}

/// `GET /chat/quota`
pub async fn quota(
    State(state): State<AppState>,
    ClientKey(key): ClientKey,
) -> Result<Json<QuotaResponse>, ApiError> {
    let limiter = &state.limiter;
    let current = limiter.state(&key)?;

    Ok(Json(QuotaResponse {
        limit: limiter.limit(),
        remaining: limiter.limit().saturating_sub(current.count),
        resets_at: (current.count > 0).then(|| current.resets_at(limiter.window())),
    }))
}

// ============================================================================
// Health
// ============================================================================

/// Reply to `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"healthy"` when the process answers.
    pub status: String,
    /// Service name.
    pub name: String,
    /// Crate version.
    pub version: String,
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
