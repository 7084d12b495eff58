//! Authenticated HTTP client and request descriptors.

mod client;
mod request;

pub(crate) use client::error_message;
pub use client::HttpClient;
pub use request::{segment, ApiRequest, Body, Endpoint, Method, UploadForm};

use serde::Deserialize;

use crate::error::ApiError;

/// Payload type for endpoints whose response data is irrelevant.
pub type Ignored = serde::de::IgnoredAny;

/// The envelope every JSON response is wrapped in.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    /// Application status code; zero means success.
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Envelope for a 2xx response with no body at all.
    pub(crate) const fn empty() -> Self {
        Self {
            code: 0,
            message: String::new(),
            data: None,
        }
    }

    /// The payload, failing when the server sent none.
    pub fn require_data(self) -> Result<T, ApiError> {
        self.data
            .ok_or_else(|| ApiError::Decode("response carried no data".to_string()))
    }
}
