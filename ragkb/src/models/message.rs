//! Message model representing a message in a chat session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::null_as_default;

/// Who wrote a message. Serialized lowercase, as the backend sends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    /// Heading shown above the message in a transcript.
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Assistant => "Assistant",
            Self::System => "System",
        }
    }
}

/// A retrieved passage the assistant grounded its answer on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSource {
    pub document_id: String,
    pub title: String,
    pub content: String,
    pub score: f64,
}

/// A message in a chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Server-assigned identifier, or a local placeholder for optimistic messages.
    pub id: String,
    /// Session this message belongs to.
    #[serde(default)]
    pub session_id: String,
    /// Role of the message sender.
    pub role: MessageRole,
    /// Content of the message.
    #[serde(default)]
    pub content: String,
    /// Retrieval sources attached to assistant messages.
    #[serde(default, deserialize_with = "null_as_default")]
    pub rag_sources: Vec<RagSource>,
    #[serde(default)]
    pub tokens_used: u64,
    /// When the message was created.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ChatMessage {
    /// Create a message that exists only on the client until the server echoes it.
    pub fn local(
        id: impl Into<String>,
        session_id: impl Into<String>,
        role: MessageRole,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            session_id: session_id.into(),
            role,
            content: content.into(),
            rag_sources: Vec::new(),
            tokens_used: 0,
            created_at: Some(Utc::now()),
        }
    }
}

/// Partial update merged into a cached message. `None` fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct MessagePatch {
    pub role: Option<MessageRole>,
    pub content: Option<String>,
    pub rag_sources: Option<Vec<RagSource>>,
    pub tokens_used: Option<u64>,
}

impl MessagePatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub(crate) fn apply(self, message: &mut ChatMessage) {
        if let Some(role) = self.role {
            message.role = role;
        }
        if let Some(content) = self.content {
            message.content = content;
        }
        if let Some(sources) = self.rag_sources {
            message.rag_sources = sources;
        }
        if let Some(tokens) = self.tokens_used {
            message.tokens_used = tokens;
        }
    }
}

/// Reply to a non-streaming chat call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatReply {
    pub message_id: String,
    pub content: String,
    #[serde(deserialize_with = "null_as_default")]
    pub rag_sources: Vec<RagSource>,
    pub tokens_used: u64,
}
