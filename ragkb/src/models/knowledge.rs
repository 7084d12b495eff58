//! Knowledge base model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named collection of ingested documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub id: String,
    pub name: String,
    /// Stable identifier used as the vector collection name.
    #[serde(default)]
    pub english_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub embedding_model: String,
    #[serde(default)]
    pub collection_name: String,
    #[serde(default)]
    pub document_count: u64,
    /// Sum of document sizes in bytes.
    #[serde(default)]
    pub total_size: u64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub is_builtin: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Partial update merged into a cached knowledge base.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KnowledgeBasePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl KnowledgeBasePatch {
    pub(crate) fn apply(self, kb: &mut KnowledgeBase) {
        if let Some(name) = self.name {
            kb.name = name;
        }
        if let Some(description) = self.description {
            kb.description = description;
        }
        if let Some(status) = self.status {
            kb.status = status;
        }
    }
}
