//! Chat sessions and the messages of the selected session.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error};

use super::Loading;
use crate::api::{chat, PageQuery};
use crate::error::ApiError;
use crate::http::HttpClient;
use crate::models::{ChatMessage, ChatSession, MessagePatch, Page};

/// Point-in-time copy of the chat store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatSnapshot {
    pub sessions: Vec<ChatSession>,
    pub current_session_id: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub loading: bool,
}

#[derive(Debug, Default)]
struct ChatState {
    sessions: Vec<ChatSession>,
    current_session_id: Option<String>,
    messages: Vec<ChatMessage>,
}

#[derive(Debug)]
pub struct ChatStore {
    client: Arc<HttpClient>,
    state: RwLock<ChatState>,
    loading: Loading,
}

impl ChatStore {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            state: RwLock::new(ChatState::default()),
            loading: Loading::default(),
        }
    }

    /// Replace the session list with one page from the server.
    ///
    /// Returns the server's total count.
    pub async fn fetch_sessions(&self, query: PageQuery) -> Result<u64, ApiError> {
        let _loading = self.loading.start();
        let page = self
            .client
            .call(chat::list_sessions(query))
            .await
            .inspect_err(|e| error!(error = %e, "failed to fetch chat sessions"))?
            .data
            .unwrap_or_default();

        let total = page.total;
        let sessions = page.into_items();
        debug!(count = sessions.len(), total, "loaded chat sessions");
        self.state.write().await.sessions = sessions;
        Ok(total)
    }

    /// Replace the message list with one page of a session's history.
    pub async fn fetch_messages(&self, session_id: &str, query: PageQuery) -> Result<u64, ApiError> {
        let _loading = self.loading.start();
        let page: Page<ChatMessage> = self
            .client
            .call(chat::list_messages(session_id, query))
            .await
            .inspect_err(|e| error!(session_id, error = %e, "failed to fetch messages"))?
            .data
            .unwrap_or_default();

        let total = page.total;
        self.state.write().await.messages = page.into_items();
        Ok(total)
    }

    pub async fn set_current_session(&self, session_id: impl Into<String>) {
        self.state.write().await.current_session_id = Some(session_id.into());
    }

    /// Deselect the session and drop its messages.
    pub async fn clear_current_session(&self) {
        let mut state = self.state.write().await;
        state.current_session_id = None;
        state.messages.clear();
    }

    /// Newest first.
    pub async fn add_session(&self, session: ChatSession) {
        self.state.write().await.sessions.insert(0, session);
    }

    /// Drop a session, keeping the others in order. Deselects it if current.
    pub async fn remove_session(&self, session_id: &str) -> Option<ChatSession> {
        let mut state = self.state.write().await;
        let index = state.sessions.iter().position(|s| s.id == session_id)?;
        let removed = state.sessions.remove(index);
        if state.current_session_id.as_deref() == Some(session_id) {
            state.current_session_id = None;
            state.messages.clear();
        }
        Some(removed)
    }

    /// Replace a cached session with a fresher copy, matched by id.
    pub async fn replace_session(&self, session: ChatSession) -> bool {
        let mut state = self.state.write().await;
        match state.sessions.iter_mut().find(|s| s.id == session.id) {
            Some(slot) => {
                *slot = session;
                true
            }
            None => false,
        }
    }

    pub async fn add_message(&self, message: ChatMessage) {
        self.state.write().await.messages.push(message);
    }

    /// Merge `patch` into the message with `message_id`. Returns whether it was found.
    pub async fn update_message(&self, message_id: &str, patch: MessagePatch) -> bool {
        let mut state = self.state.write().await;
        match state.messages.iter_mut().find(|m| m.id == message_id) {
            Some(message) => {
                patch.apply(message);
                true
            }
            None => false,
        }
    }

    pub async fn session_list(&self) -> Vec<ChatSession> {
        self.state.read().await.sessions.clone()
    }

    pub async fn current_session_id(&self) -> Option<String> {
        self.state.read().await.current_session_id.clone()
    }

    pub async fn message_list(&self) -> Vec<ChatMessage> {
        self.state.read().await.messages.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    pub async fn snapshot(&self) -> ChatSnapshot {
        let state = self.state.read().await;
        ChatSnapshot {
            sessions: state.sessions.clone(),
            current_session_id: state.current_session_id.clone(),
            messages: state.messages.clone(),
            loading: self.loading.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageRole;
    use crate::store::testing::offline_client;

    fn session(id: &str) -> ChatSession {
        serde_json::from_value(serde_json::json!({"id": id, "title": id})).unwrap()
    }

    #[tokio::test]
    async fn remove_session_preserves_order() {
        let store = ChatStore::new(offline_client());
        store.add_session(session("C")).await;
        store.add_session(session("B")).await;
        store.add_session(session("A")).await;

        let removed = store.remove_session("B").await;
        assert_eq!(removed.map(|s| s.id), Some("B".to_string()));

        let ids: Vec<_> = store.session_list().await.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, ["A", "C"]);
        assert!(store.remove_session("missing").await.is_none());
    }

    #[tokio::test]
    async fn removing_current_session_deselects_it() {
        let store = ChatStore::new(offline_client());
        store.add_session(session("A")).await;
        store.set_current_session("A").await;
        store
            .add_message(ChatMessage::local("m1", "A", MessageRole::User, "hi"))
            .await;

        store.remove_session("A").await;
        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.current_session_id, None);
        assert!(snapshot.messages.is_empty());
    }

    #[tokio::test]
    async fn messages_append_and_merge() {
        let store = ChatStore::new(offline_client());
        store
            .add_message(ChatMessage::local("m1", "A", MessageRole::User, "hi"))
            .await;
        store
            .add_message(ChatMessage::local("m2", "A", MessageRole::Assistant, ""))
            .await;

        assert!(store.update_message("m2", MessagePatch::content("Hello")).await);
        assert!(!store.update_message("m3", MessagePatch::content("x")).await);

        let messages = store.message_list().await;
        assert_eq!(messages[0].content, "hi");
        assert_eq!(messages[1].content, "Hello");
    }

    #[tokio::test]
    async fn clear_current_session_drops_messages() {
        let store = ChatStore::new(offline_client());
        store.set_current_session("A").await;
        store
            .add_message(ChatMessage::local("m1", "A", MessageRole::User, "hi"))
            .await;
        store.clear_current_session().await;
        assert_eq!(store.current_session_id().await, None);
        assert!(store.message_list().await.is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_keeps_list_and_clears_loading() {
        let store = ChatStore::new(offline_client());
        store.add_session(session("A")).await;

        assert!(store.fetch_sessions(PageQuery::default()).await.is_err());
        assert!(!store.is_loading());
        assert_eq!(store.session_list().await.len(), 1);
    }
}
