//! Document endpoints, nested under a knowledge base.

use super::PageQuery;
use crate::http::{segment, ApiRequest, Endpoint, Ignored, UploadForm};
use crate::models::{KnowledgeDocument, Page};

/// Filters for listing documents.
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    pub page: PageQuery,
    /// Parsing status to filter on.
    pub status: Option<String>,
}

fn documents_path(kb_id: &str) -> String {
    format!("/knowledge-bases/{}/documents", segment(kb_id))
}

fn document_path(kb_id: &str, doc_id: &str) -> String {
    format!("{}/{}", documents_path(kb_id), segment(doc_id))
}

/// `GET /knowledge-bases/{kb}/documents`
pub fn list_documents(kb_id: &str, query: &DocumentQuery) -> Endpoint<Page<KnowledgeDocument>> {
    query
        .page
        .apply(ApiRequest::get(documents_path(kb_id)))
        .query_opt("status", query.status.as_deref())
        .into()
}

/// `GET /knowledge-bases/{kb}/documents/{doc}`
pub fn get_document(kb_id: &str, doc_id: &str) -> Endpoint<KnowledgeDocument> {
    ApiRequest::get(document_path(kb_id, doc_id)).into()
}

/// `POST /knowledge-bases/{kb}/documents/upload` as `multipart/form-data`.
///
/// The knowledge base id is repeated as a form field for backends that read
/// it from the form rather than the path.
pub fn upload_document(kb_id: &str, form: UploadForm) -> Endpoint<KnowledgeDocument> {
    let form = if form.fields.iter().any(|(k, _)| k == "knowledge_base_id") {
        form
    } else {
        form.text("knowledge_base_id", kb_id)
    };
    ApiRequest::post(format!("{}/upload", documents_path(kb_id)))
        .multipart(form)
        .into()
}

/// `DELETE /knowledge-bases/{kb}/documents/{doc}`
pub fn delete_document(kb_id: &str, doc_id: &str) -> Endpoint<Ignored> {
    ApiRequest::delete(document_path(kb_id, doc_id)).into()
}

/// `POST /knowledge-bases/{kb}/documents/{doc}/reprocess`
pub fn reprocess_document(kb_id: &str, doc_id: &str) -> Endpoint<Ignored> {
    ApiRequest::post(format!("{}/reprocess", document_path(kb_id, doc_id))).into()
}
