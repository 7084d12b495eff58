//! Client-side state containers.
//!
//! Each store mirrors one slice of server state. Actions hold no lock across
//! a network await: they read what they need, release, call the API, then
//! take the write lock to apply the result. Overlapping actions therefore
//! race and the later response wins.

pub mod chat;
pub mod knowledge;
pub mod user;

pub use chat::{ChatSnapshot, ChatStore};
pub use knowledge::{KnowledgeSnapshot, KnowledgeStore};
pub use user::UserStore;

use std::sync::atomic::{AtomicBool, Ordering};

/// In-flight flag shared by a store's actions.
#[derive(Debug, Default)]
pub(crate) struct Loading(AtomicBool);

impl Loading {
    pub(crate) fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Raise the flag until the returned guard is dropped.
    pub(crate) fn start(&self) -> LoadingGuard<'_> {
        self.0.store(true, Ordering::Release);
        LoadingGuard(&self.0)
    }
}

/// Clears the loading flag however the action ends.
pub(crate) struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
