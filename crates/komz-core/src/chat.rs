//! Chat roles, messages, and in-memory conversations.
//!
//! A [`Conversation`] only lives for one visitor session. Nothing here is
//! persisted; the gateway receives the history with every request and the
//! CLI keeps it in memory until the user quits.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Id of the greeting every new conversation starts with.
pub const WELCOME_MESSAGE_ID: &str = "welcome";

/// Greeting shown before the visitor types anything.
pub const WELCOME_MESSAGE: &str = "👋 Welcome! I'm the Komz Consulting Chatbot. I'm here to answer \
questions about our services, expertise, and how we can help transform your business. \
Feel free to ask me anything!";

/// Reply used when the model answers with no text at all.
pub const EMPTY_REPLY_FALLBACK: &str =
    "I apologize, but I couldn't generate a response. Please try again.";

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The site visitor.
    User,
    /// The generative model.
    Model,
    /// Instructions injected by the site.
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Model => write!(f, "model"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Opaque message identifier.
///
/// Browser clients send whatever ids they generated, so this is a string
/// rather than a UUID. Ids minted here are UUID v4.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Creates a message ID from a string.
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Creates a new random message ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the message ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message id, unique within a conversation.
    pub id: MessageId,
    /// Author of the message.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// When the message was created.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates a message with a fresh id and the current time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a visitor message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates a model message.
    pub fn model(content: impl Into<String>) -> Self {
        Self::new(Role::Model, content)
    }

    /// Creates a model message from an optional reply, substituting the
    /// apology text when the model produced nothing. Whitespace-only text is
    /// kept as-is.
    pub fn model_reply(reply: Option<String>) -> Self {
        let content = reply
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| EMPTY_REPLY_FALLBACK.to_string());
        Self::model(content)
    }

    /// The greeting that opens every conversation.
    pub fn welcome() -> Self {
        Self {
            id: MessageId::new(WELCOME_MESSAGE_ID),
            role: Role::Model,
            content: WELCOME_MESSAGE.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered messages of one chat session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Starts a conversation with the welcome message.
    pub fn new() -> Self {
        Self {
            messages: vec![Message::welcome()],
        }
    }

    /// Starts a conversation with no messages.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Appends a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// All messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The most recent message.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the conversation has no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl From<Vec<Message>> for Conversation {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}
