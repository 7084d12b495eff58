//! Session model representing a chat conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::null_as_default;

/// A chat session: an ordered conversation plus its retrieval settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    /// Unique session identifier.
    pub id: String,
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub title: String,
    /// Knowledge bases searched for context when answering in this session.
    #[serde(default, deserialize_with = "null_as_default")]
    pub knowledge_base_ids: Vec<String>,
    #[serde(default)]
    pub use_rag: bool,
    #[serde(default)]
    pub top_k: u32,
    #[serde(default)]
    pub similarity_threshold: f64,
    #[serde(default)]
    pub similarity_weight: f64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message_count: u64,
    /// When the session was created.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}
