//! Knowledge bases visible to the current user.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error};

use super::Loading;
use crate::api::knowledge::{self, KnowledgeBaseQuery};
use crate::error::ApiError;
use crate::http::HttpClient;
use crate::models::{KnowledgeBase, KnowledgeBasePatch};

/// Point-in-time copy of the knowledge store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeSnapshot {
    pub knowledge_bases: Vec<KnowledgeBase>,
    pub current: Option<KnowledgeBase>,
    pub loading: bool,
}

#[derive(Debug, Default)]
struct KnowledgeState {
    knowledge_bases: Vec<KnowledgeBase>,
    current: Option<KnowledgeBase>,
}

#[derive(Debug)]
pub struct KnowledgeStore {
    client: Arc<HttpClient>,
    state: RwLock<KnowledgeState>,
    loading: Loading,
}

impl KnowledgeStore {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            state: RwLock::new(KnowledgeState::default()),
            loading: Loading::default(),
        }
    }

    /// Replace the list with one page from the server. Returns the total count.
    pub async fn fetch_knowledge_bases(&self, query: &KnowledgeBaseQuery) -> Result<u64, ApiError> {
        let _loading = self.loading.start();
        let page = self
            .client
            .call(knowledge::list_knowledge_bases(query))
            .await
            .inspect_err(|e| error!(error = %e, "failed to fetch knowledge bases"))?
            .data
            .unwrap_or_default();

        let total = page.total;
        let knowledge_bases = page.into_items();
        debug!(count = knowledge_bases.len(), total, "loaded knowledge bases");
        self.state.write().await.knowledge_bases = knowledge_bases;
        Ok(total)
    }

    pub async fn set_current_knowledge_base(&self, kb: KnowledgeBase) {
        self.state.write().await.current = Some(kb);
    }

    pub async fn clear_current_knowledge_base(&self) {
        self.state.write().await.current = None;
    }

    /// Newest first.
    pub async fn add_knowledge_base(&self, kb: KnowledgeBase) {
        self.state.write().await.knowledge_bases.insert(0, kb);
    }

    /// Merge `patch` into the cached entry and the selection, if either matches.
    pub async fn update_knowledge_base(&self, id: &str, patch: KnowledgeBasePatch) -> bool {
        let mut state = self.state.write().await;
        if let Some(current) = state.current.as_mut().filter(|kb| kb.id == id) {
            patch.clone().apply(current);
        }
        match state.knowledge_bases.iter_mut().find(|kb| kb.id == id) {
            Some(kb) => {
                patch.apply(kb);
                true
            }
            None => false,
        }
    }

    /// Drop an entry, keeping the others in order. Deselects it if current.
    pub async fn remove_knowledge_base(&self, id: &str) -> Option<KnowledgeBase> {
        let mut state = self.state.write().await;
        if state.current.as_ref().is_some_and(|kb| kb.id == id) {
            state.current = None;
        }
        let index = state.knowledge_bases.iter().position(|kb| kb.id == id)?;
        Some(state.knowledge_bases.remove(index))
    }

    pub async fn knowledge_base_list(&self) -> Vec<KnowledgeBase> {
        self.state.read().await.knowledge_bases.clone()
    }

    pub async fn current_knowledge_base(&self) -> Option<KnowledgeBase> {
        self.state.read().await.current.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    pub async fn snapshot(&self) -> KnowledgeSnapshot {
        let state = self.state.read().await;
        KnowledgeSnapshot {
            knowledge_bases: state.knowledge_bases.clone(),
            current: state.current.clone(),
            loading: self.loading.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::offline_client;

    fn kb(id: &str, name: &str) -> KnowledgeBase {
        serde_json::from_value(serde_json::json!({"id": id, "name": name})).unwrap()
    }

    #[tokio::test]
    async fn add_prepends_and_remove_keeps_order() {
        let store = KnowledgeStore::new(offline_client());
        store.add_knowledge_base(kb("3", "c")).await;
        store.add_knowledge_base(kb("2", "b")).await;
        store.add_knowledge_base(kb("1", "a")).await;

        store.remove_knowledge_base("2").await;
        let ids: Vec<_> = store
            .knowledge_base_list()
            .await
            .into_iter()
            .map(|kb| kb.id)
            .collect();
        assert_eq!(ids, ["1", "3"]);
    }

    #[tokio::test]
    async fn update_merges_into_list_and_selection() {
        let store = KnowledgeStore::new(offline_client());
        store.add_knowledge_base(kb("1", "Handbook")).await;
        store.set_current_knowledge_base(kb("1", "Handbook")).await;

        let patch = KnowledgeBasePatch {
            description: Some("Company policies".into()),
            ..KnowledgeBasePatch::default()
        };
        assert!(store.update_knowledge_base("1", patch).await);

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.knowledge_bases[0].description, "Company policies");
        assert_eq!(snapshot.knowledge_bases[0].name, "Handbook");
        assert_eq!(
            snapshot.current.map(|kb| kb.description),
            Some("Company policies".to_string())
        );
    }

    #[tokio::test]
    async fn removing_selected_clears_selection() {
        let store = KnowledgeStore::new(offline_client());
        store.add_knowledge_base(kb("1", "a")).await;
        store.set_current_knowledge_base(kb("1", "a")).await;
        store.remove_knowledge_base("1").await;
        assert_eq!(store.current_knowledge_base().await, None);

        store.set_current_knowledge_base(kb("2", "b")).await;
        store.clear_current_knowledge_base().await;
        assert_eq!(store.current_knowledge_base().await, None);
    }
}
