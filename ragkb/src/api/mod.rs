//! Resource API modules.
//!
//! One function per backend endpoint. Each maps its arguments to an
//! [`Endpoint`](crate::http::Endpoint) and does nothing else; sending is the
//! caller's business via [`HttpClient::call`](crate::http::HttpClient::call).

pub mod auth;
pub mod chat;
pub mod document;
pub mod knowledge;
mod sse;
pub mod stream;
pub mod user;

pub use sse::{SseDecoder, SseError, SseFrame, MAX_EVENT_BYTES};

use crate::http::ApiRequest;

/// Pagination parameters shared by every list endpoint.
///
/// Unset fields are left off the query string so the server defaults apply
/// (page 1, 20 items).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageQuery {
    pub const fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
        }
    }

    pub(crate) fn apply(self, request: ApiRequest) -> ApiRequest {
        request
            .query_opt("page", self.page)
            .query_opt("page_size", self.page_size)
    }
}
