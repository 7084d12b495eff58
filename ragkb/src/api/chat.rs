//! Chat session and message endpoints.

use serde::Serialize;

use super::PageQuery;
use crate::http::{segment, ApiRequest, Endpoint, Ignored};
use crate::models::{ChatMessage, ChatReply, ChatSession, Page};

/// Settings for creating or updating a session.
///
/// Unset numeric fields keep the server default (`top_k` 3, threshold 0.7,
/// weight 1.5) on create and the current value on update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSettings {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub knowledge_base_ids: Vec<String>,
    pub use_rag: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_weight: Option<f64>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            title: String::new(),
            knowledge_base_ids: Vec::new(),
            use_rag: true,
            top_k: None,
            similarity_threshold: None,
            similarity_weight: None,
        }
    }
}

impl From<&ChatSession> for SessionSettings {
    /// Current settings of a session, as the base for an update.
    fn from(session: &ChatSession) -> Self {
        Self {
            title: session.title.clone(),
            knowledge_base_ids: session.knowledge_base_ids.clone(),
            use_rag: session.use_rag,
            top_k: Some(session.top_k).filter(|k| *k > 0),
            similarity_threshold: Some(session.similarity_threshold),
            similarity_weight: Some(session.similarity_weight),
        }
    }
}

/// Body of a non-streaming chat call.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest {
    pub session_id: String,
    pub message: String,
    pub stream: bool,
}

fn session_path(session_id: &str) -> String {
    format!("/chat/sessions/{}", segment(session_id))
}

/// `GET /chat/sessions`
pub fn list_sessions(query: PageQuery) -> Endpoint<Page<ChatSession>> {
    query.apply(ApiRequest::get("/chat/sessions")).into()
}

/// `POST /chat/sessions`
pub fn create_session(settings: &SessionSettings) -> Endpoint<ChatSession> {
    ApiRequest::post("/chat/sessions").json(settings).into()
}

/// `GET /chat/sessions/{id}`
pub fn get_session(session_id: &str) -> Endpoint<ChatSession> {
    ApiRequest::get(session_path(session_id)).into()
}

/// `PUT /chat/sessions/{id}`
pub fn update_session(session_id: &str, settings: &SessionSettings) -> Endpoint<ChatSession> {
    ApiRequest::put(session_path(session_id))
        .json(settings)
        .into()
}

/// `DELETE /chat/sessions/{id}`
pub fn delete_session(session_id: &str) -> Endpoint<Ignored> {
    ApiRequest::delete(session_path(session_id)).into()
}

/// `GET /chat/sessions/{id}/messages`
pub fn list_messages(session_id: &str, query: PageQuery) -> Endpoint<Page<ChatMessage>> {
    query
        .apply(ApiRequest::get(format!(
            "{}/messages",
            session_path(session_id)
        )))
        .into()
}

/// `POST /chat/sessions/{id}/messages`
pub fn send_message(session_id: &str, message: &str) -> Endpoint<ChatReply> {
    ApiRequest::post(format!("{}/messages", session_path(session_id)))
        .json(&SendMessageRequest {
            session_id: session_id.to_string(),
            message: message.to_string(),
            stream: false,
        })
        .into()
}

/// `GET /chat/sessions/{id}/messages/stream`
///
/// Describes the push connection only; open it with
/// [`ChatStream::open`](super::stream::ChatStream::open). The token travels in
/// the query string because the push transport cannot carry custom headers.
pub fn stream_message(session_id: &str, question: &str, token: Option<&str>) -> ApiRequest {
    ApiRequest::get(format!("{}/messages/stream", session_path(session_id)))
        .query("question", question)
        .query_opt("token", token)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::http::Method;

    #[test]
    fn list_sessions_forwards_pagination() {
        let endpoint = list_sessions(PageQuery::new(2, 10));
        let request = endpoint.request();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path, "/chat/sessions");
        assert_eq!(request.query_value("page"), Some("2"));
        assert_eq!(request.query_value("page_size"), Some("10"));

        assert!(list_sessions(PageQuery::default()).request().query.is_empty());
    }

    #[test]
    fn create_session_omits_unset_settings() {
        let settings = SessionSettings {
            title: "Onboarding".into(),
            knowledge_base_ids: vec!["kb-1".into()],
            ..SessionSettings::default()
        };
        let endpoint = create_session(&settings);
        assert_eq!(endpoint.request().method, Method::POST);
        assert_eq!(
            endpoint.request().json_body(),
            Some(&json!({"title": "Onboarding", "knowledge_base_ids": ["kb-1"], "use_rag": true}))
        );
    }

    #[test]
    fn settings_from_session_keep_retrieval_tuning() {
        let session: ChatSession = serde_json::from_value(json!({
            "id": "s-1",
            "title": "Old",
            "knowledge_base_ids": ["kb-1"],
            "use_rag": false,
            "top_k": 5,
            "similarity_threshold": 0.5,
            "similarity_weight": 2.0
        }))
        .unwrap();
        let settings = SessionSettings {
            title: "New".into(),
            ..SessionSettings::from(&session)
        };
        assert_eq!(
            update_session("s-1", &settings).request().json_body(),
            Some(&json!({
                "title": "New",
                "knowledge_base_ids": ["kb-1"],
                "use_rag": false,
                "top_k": 5,
                "similarity_threshold": 0.5,
                "similarity_weight": 2.0
            }))
        );
    }

    #[test]
    fn session_paths() {
        assert_eq!(get_session("s-1").request().path, "/chat/sessions/s-1");
        assert_eq!(delete_session("s-1").request().method, Method::DELETE);
        assert_eq!(delete_session("s-1").request().path, "/chat/sessions/s-1");
        assert_eq!(
            update_session("s-1", &SessionSettings::default()).request().method,
            Method::PUT
        );
    }

    #[test]
    fn messages_paths() {
        let list = list_messages("s-1", PageQuery::default());
        assert_eq!(list.request().path, "/chat/sessions/s-1/messages");

        let send = send_message("s-1", "What is RAG?");
        assert_eq!(send.request().method, Method::POST);
        assert_eq!(send.request().path, "/chat/sessions/s-1/messages");
        assert_eq!(
            send.request().json_body(),
            Some(&json!({"session_id": "s-1", "message": "What is RAG?", "stream": false}))
        );
    }

    #[test]
    fn stream_request_carries_question_and_token() {
        let request = stream_message("s-1", "why & how?", Some("tok"));
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path, "/chat/sessions/s-1/messages/stream");
        assert_eq!(request.query_value("question"), Some("why & how?"));
        assert_eq!(request.query_value("token"), Some("tok"));

        let anonymous = stream_message("s-1", "hi", None);
        assert_eq!(anonymous.query_value("token"), None);
    }
}
