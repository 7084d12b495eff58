//! Document model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file ingested into a knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub id: String,
    #[serde(default)]
    pub knowledge_base_id: String,
    /// Original file name.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub file_size: u64,
    /// MIME type reported at upload.
    #[serde(default)]
    pub file_type: String,
    /// Parsing status: `pending`, `processing`, `completed` or `failed`.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub chunk_count: u64,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}
