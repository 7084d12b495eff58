//! Paginated list payload.

use serde::{Deserialize, Serialize};

/// One page of a list endpoint.
///
/// `items` stays optional because the backend omits it or sends `null` for an
/// empty page; use [`Page::into_items`] to read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    pub items: Option<Vec<T>>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            total: 0,
            page: 0,
            page_size: 0,
            items: None,
        }
    }
}

impl<T> Page<T> {
    /// Items on this page, empty when the payload carried none.
    pub fn items(&self) -> &[T] {
        self.items.as_deref().unwrap_or_default()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items.unwrap_or_default()
    }
}
