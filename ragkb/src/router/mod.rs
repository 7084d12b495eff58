//! Client-side routing: the route table, the navigation guard, and the
//! navigation sink the HTTP client and user store push forced redirects into.

mod guard;
mod routes;

pub use guard::{resolve, AuthSnapshot, AuthState, GuardDecision, Navigation, Resolution, Router};
pub use routes::{match_route, Route, ROUTES};

use std::sync::Mutex;

/// Login screen; forced-logout redirects land here.
pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const HOME_PATH: &str = "/";

/// Receives programmatic navigations.
pub trait Navigator: Send + Sync {
    fn push(&self, path: &str);
}

/// Navigator that records every push, newest last.
#[derive(Debug, Default)]
pub struct History {
    entries: Mutex<Vec<String>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Most recent push.
    pub fn last(&self) -> Option<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.last().cloned())
    }
}

impl Navigator for History {
    fn push(&self, path: &str) {
        tracing::debug!(path, "navigate");
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(path.to_string());
        }
    }
}
