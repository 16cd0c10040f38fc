//! In-process provider doubles for tests and offline runs.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use komz_core::Message;

use crate::provider::{ChatProvider, VoiceCallProvider};
use crate::{Error, Result};

const PROVIDER: &str = "mock";

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Empty,
    Fail(String),
}

impl Reply {
    fn into_result(self) -> Result<Option<String>> {
        match self {
            Reply::Text(text) => Ok(Some(text)),
            Reply::Empty => Ok(None),
            Reply::Fail(message) => Err(failure(message)),
        }
    }
}

fn failure(message: String) -> Error {
    Error::Upstream {
        provider: PROVIDER,
        status: 503,
        message,
    }
}

/// One recorded `generate` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPrompt {
    /// Number of history messages sent along.
    pub history_len: usize,
    /// The prompt text.
    pub prompt: String,
}

/// Chat provider that replays canned replies.
///
/// Replies are used in order; the last one repeats once the queue runs dry.
#[derive(Debug)]
pub struct MockChatProvider {
    replies: Mutex<VecDeque<Reply>>,
    last: Reply,
    calls: Mutex<Vec<RecordedPrompt>>,
}

impl MockChatProvider {
    fn from_replies(mut replies: VecDeque<Reply>) -> Self {
        let last = replies.back().cloned().unwrap_or(Reply::Empty);
        if replies.len() == 1 {
            replies.clear();
        }
        Self {
            replies: Mutex::new(replies),
            last,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Replies with the given texts in order.
    pub fn new(responses: Vec<String>) -> Self {
        Self::from_replies(responses.into_iter().map(Reply::Text).collect())
    }

    /// Always replies with `text`.
    pub fn with_response(text: impl Into<String>) -> Self {
        Self::new(vec![text.into()])
    }

    /// Always answers without any text.
    pub fn empty() -> Self {
        Self::from_replies(VecDeque::from([Reply::Empty]))
    }

    /// Always fails with an upstream error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::from_replies(VecDeque::from([Reply::Fail(message.into())]))
    }

    /// Every call made so far.
    pub fn calls(&self) -> Vec<RecordedPrompt> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    async fn generate(&self, history: &[Message], prompt: &str) -> Result<Option<String>> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedPrompt {
                history_len: history.len(),
                prompt: prompt.to_string(),
            });

        let next = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let reply = match next {
            Some(reply) => reply,
            None => self.last.clone(),
        };
        reply.into_result()
    }
}

/// Voice provider that returns a fixed call payload or a fixed failure.
#[derive(Debug)]
pub struct MockVoiceProvider {
    outcome: std::result::Result<serde_json::Value, String>,
    agents: Mutex<Vec<String>>,
}

impl MockVoiceProvider {
    /// Always returns `call`.
    pub fn with_response(call: serde_json::Value) -> Self {
        Self {
            outcome: Ok(call),
            agents: Mutex::new(Vec::new()),
        }
    }

    /// Always fails with an upstream error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            agents: Mutex::new(Vec::new()),
        }
    }

    /// Agent ids requested so far.
    pub fn agents(&self) -> Vec<String> {
        self.agents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl VoiceCallProvider for MockVoiceProvider {
    async fn create_web_call(&self, agent_id: &str) -> Result<serde_json::Value> {
        self.agents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(agent_id.to_string());
        self.outcome.clone().map_err(failure)
    }
}
