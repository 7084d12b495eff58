//! Knowledge base endpoints.

use serde::Serialize;

use super::PageQuery;
use crate::http::{segment, ApiRequest, Endpoint, Ignored};
use crate::models::{KnowledgeBase, KnowledgeBasePatch, Page};

/// Filters for listing knowledge bases.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBaseQuery {
    pub page: PageQuery,
    pub status: Option<String>,
}

/// Body of `POST /knowledge-bases`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateKnowledgeBaseRequest {
    pub name: String,
    /// Must be unique; becomes the vector collection name.
    pub english_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
}

fn kb_path(id: &str) -> String {
    format!("/knowledge-bases/{}", segment(id))
}

/// `GET /knowledge-bases`
pub fn list_knowledge_bases(query: &KnowledgeBaseQuery) -> Endpoint<Page<KnowledgeBase>> {
    query
        .page
        .apply(ApiRequest::get("/knowledge-bases"))
        .query_opt("status", query.status.as_deref())
        .into()
}

/// `GET /knowledge-bases/{id}`
pub fn get_knowledge_base(id: &str) -> Endpoint<KnowledgeBase> {
    ApiRequest::get(kb_path(id)).into()
}

/// `POST /knowledge-bases`
pub fn create_knowledge_base(body: &CreateKnowledgeBaseRequest) -> Endpoint<KnowledgeBase> {
    ApiRequest::post("/knowledge-bases").json(body).into()
}

/// `PUT /knowledge-bases/{id}`
pub fn update_knowledge_base(id: &str, patch: &KnowledgeBasePatch) -> Endpoint<KnowledgeBase> {
    ApiRequest::put(kb_path(id)).json(patch).into()
}

/// `DELETE /knowledge-bases/{id}`
pub fn delete_knowledge_base(id: &str) -> Endpoint<Ignored> {
    ApiRequest::delete(kb_path(id)).into()
}
