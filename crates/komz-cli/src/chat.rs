//! Terminal chat against the configured model.
//!
//! The terminal session is held to the same demo quota as the website,
//! persisted on disk so it survives restarts.

use std::sync::Arc;

use komz_client::ChatProvider;
use komz_core::rate_limit::DEFAULT_STORAGE_KEY;
use komz_core::{Conversation, Message, RateLimiter, sanitize_input};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::Result;

/// Outcome of one line typed by the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    /// Nothing left after cleanup; nothing was sent.
    Skipped,
    /// The model answered.
    Reply {
        /// Reply text
        content: String,
        /// Messages left in this window
        remaining: u32,
    },
    /// The quota is used up.
    Limited {
        /// Seconds until the window resets
        retry_after_secs: u64,
    },
    /// The provider failed; the message was not counted.
    Failed(String),
}

/// One chat conversation plus its quota.
pub struct ChatSession {
    provider: Arc<dyn ChatProvider>,
    limiter: Arc<RateLimiter>,
    key: String,
    conversation: Conversation,
}

impl ChatSession {
    /// New session starting from the welcome message.
    pub fn new(provider: Arc<dyn ChatProvider>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            provider,
            limiter,
            key: DEFAULT_STORAGE_KEY.to_string(),
            conversation: Conversation::new(),
        }
    }

    /// Messages so far.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Messages left in this window.
    pub fn remaining(&self) -> Result<u32> {
        Ok(self.limiter.remaining(&self.key)?)
    }

    /// Sends one line.
    pub async fn send(&mut self, raw: &str) -> Result<Turn> {
        let prompt = sanitize_input(raw);
        if prompt.is_empty() {
            return Ok(Turn::Skipped);
        }

        let reservation = match self.limiter.try_reserve(&self.key) {
            Ok(reservation) => reservation,
            Err(komz_core::Error::RateLimited { retry_after, .. }) => {
                return Ok(Turn::Limited {
                    retry_after_secs: retry_after.as_secs(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        // History sent upstream excludes the prompt itself.
        let reply = self
            .provider
            .generate(self.conversation.messages(), &prompt)
            .await;
        self.conversation.push(Message::user(prompt));

        match reply {
            Ok(text) => {
                let message = Message::model_reply(text);
                let content = message.content.clone();
                self.conversation.push(message);
                let remaining = reservation.remaining();
                reservation.commit();
                Ok(Turn::Reply { content, remaining })
            }
            Err(e) => {
                tracing::warn!(error = %e, "Chat reply failed");
                Ok(Turn::Failed(e.to_string()))
            }
        }
    }
}

/// Reads lines from `input` until EOF or `/quit`, printing replies to `output`.
pub async fn run_repl<R, W>(session: &mut ChatSession, input: R, output: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let welcome = session
        .conversation()
        .last()
        .map(|m| m.content.clone())
        .unwrap_or_default();
    let remaining = session.remaining()?;
    output
        .write_all(format!("{welcome}\n({remaining} messages left)\n").as_bytes())
        .await?;

    let mut lines = input.lines();
    loop {
        output.write_all(b"> ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if matches!(line.trim(), "/quit" | "/exit") {
            break;
        }

        let text = match session.send(&line).await? {
            Turn::Skipped => continue,
            Turn::Reply { content, remaining } => {
                format!("{content}\n({remaining} messages left)\n")
            }
            Turn::Limited { retry_after_secs } => format!(
                "You've reached the message limit for this demo. \
                 Please try again in {} minutes.\n",
                retry_after_secs.div_ceil(60)
            ),
            Turn::Failed(message) => format!("error: {message}\n"),
        };
        output.write_all(text.as_bytes()).await?;
    }

    output.flush().await?;
    Ok(())
}
