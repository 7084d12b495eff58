//! In-process mock backend shared by the integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use ragkb::notify::NoticeBuffer;
use ragkb::router::History;
use ragkb::storage::{ClientStorage, MemoryStorage, ACCESS_TOKEN, REFRESH_TOKEN, USER_INFO};
use ragkb::{Config, HttpClient};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const API_PREFIX: &str = "/api/v1";

/// Serve `routes` under `/api/v1` on an ephemeral port and return the base URL.
pub async fn serve(routes: Router) -> String {
    let app = Router::new().nest(API_PREFIX, routes);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}{API_PREFIX}")
}

/// Success envelope around `data`.
pub fn ok<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({"code": 0, "message": "success", "data": data}))
}

/// Error response in the backend's shape.
pub fn fail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"code": status.as_u16(), "message": message}))).into_response()
}

/// A client wired to in-memory collaborators the test can inspect.
pub struct Harness {
    pub client: Arc<HttpClient>,
    pub storage: Arc<MemoryStorage>,
    pub history: Arc<History>,
    pub notices: Arc<NoticeBuffer>,
}

impl Harness {
    pub fn new(base_url: &str) -> Self {
        let config = Config::with_storage(base_url, PathBuf::from("unused.json")).unwrap();
        let storage = Arc::new(MemoryStorage::new());
        let history = Arc::new(History::new());
        let notices = Arc::new(NoticeBuffer::new());
        let client = HttpClient::new(
            &config,
            storage.clone(),
            history.clone(),
            notices.clone(),
        )
        .unwrap();

        Self {
            client: Arc::new(client),
            storage,
            history,
            notices,
        }
    }

    pub async fn start(routes: Router) -> Self {
        Self::new(&serve(routes).await)
    }

    /// Seed storage as if `username` had logged in earlier.
    pub fn with_session(self, token: &str, username: &str) -> Self {
        self.storage.set(ACCESS_TOKEN, token).unwrap();
        self.storage.set(REFRESH_TOKEN, "refresh-1").unwrap();
        self.storage
            .set(
                USER_INFO,
                &json!({"id": 1, "username": username, "roles": [{"name": "user"}]}).to_string(),
            )
            .unwrap();
        self
    }

    pub fn stored(&self, key: &str) -> Option<String> {
        self.storage.get(key).unwrap()
    }

    pub fn notice_messages(&self) -> Vec<String> {
        self.notices
            .drain()
            .into_iter()
            .map(|notice| notice.message)
            .collect()
    }
}
