//! ragkb - client for a RAG knowledge-base service.
//!
//! Architecture:
//! - `http` wraps every call: base URL, bearer token, error notices, and the
//!   forced logout on 401
//! - `api` describes one request per backend endpoint, plus the streaming chat
//!   subscription
//! - `store` keeps client-side copies of server state for the CLI
//! - `router` decides which screens the current user may enter

pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod notify;
pub mod router;
pub mod storage;
pub mod store;

pub use config::Config;
pub use error::ApiError;
pub use http::{ApiResponse, HttpClient};
