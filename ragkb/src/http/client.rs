//! The HTTP client every resource call goes through.
//!
//! Responsibilities:
//! - resolve endpoint paths against the configured base URL
//! - attach `Authorization: Bearer <token>` from client storage
//! - turn every failure into an [`ApiError`], emit its notice, and on 401
//!   drop the stored credentials and send the user back to `/login`

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::request::{ApiRequest, Body, Endpoint};
use super::ApiResponse;
use crate::config::Config;
use crate::error::ApiError;
use crate::notify::Notifier;
use crate::router::{Navigator, LOGIN_PATH};
use crate::storage::{ClientStorage, ACCESS_TOKEN};

/// Error body shape used by the backend for non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Server-provided `message` from a non-2xx body, if it is JSON and non-empty.
pub(crate) async fn error_message(response: reqwest::Response) -> Option<String> {
    response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message)
        .filter(|m| !m.is_empty())
}

/// Authenticated client bound to one API base URL.
pub struct HttpClient {
    inner: reqwest::Client,
    /// Client without a request timeout, for long-lived streams.
    streaming: reqwest::Client,
    base_url: String,
    storage: Arc<dyn ClientStorage>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
}

impl HttpClient {
    pub fn new(
        config: &Config,
        storage: Arc<dyn ClientStorage>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let streaming = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            inner,
            streaming,
            base_url: config.api_base_url.clone(),
            storage,
            navigator,
            notifier,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an endpoint path.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Current access token, if one is stored and non-empty.
    pub fn access_token(&self) -> Option<String> {
        match self.storage.get(ACCESS_TOKEN) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "failed to read access token");
                None
            }
        }
    }

    /// Send the endpoint's request and decode its envelope.
    pub async fn call<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint<T>,
    ) -> Result<ApiResponse<T>, ApiError> {
        let request = endpoint.into_request();
        debug!(method = %request.method, path = %request.path, "sending request");

        let builder = self.build(&request).map_err(|e| self.reject(e))?;
        let response = builder
            .send()
            .await
            .map_err(|e| self.reject(ApiError::Network(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            debug!(%status, path = %request.path, "request failed");
            return Err(self.reject(ApiError::from_status(status, message)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.reject(ApiError::Network(e.to_string())))?;
        if bytes.is_empty() {
            return Ok(ApiResponse::empty());
        }

        let envelope: ApiResponse<T> = serde_json::from_slice(&bytes).map_err(|e| {
            warn!(path = %request.path, error = %e, "response did not match schema");
            ApiError::Decode(e.to_string())
        })?;

        if envelope.code != 0 {
            let message = Some(envelope.message).filter(|m| !m.is_empty());
            return Err(self.reject(ApiError::Server {
                status: status.as_u16(),
                message,
            }));
        }

        Ok(envelope)
    }

    /// Build a request on the streaming client. No bearer header is attached;
    /// push connections authenticate through the query string.
    pub(crate) fn stream_request(&self, request: &ApiRequest) -> RequestBuilder {
        let mut builder = self
            .streaming
            .request(request.method.clone(), self.url_for(&request.path));
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }

    fn build(&self, request: &ApiRequest) -> Result<RequestBuilder, ApiError> {
        let mut builder = self
            .inner
            .request(request.method.clone(), self.url_for(&request.path));

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = self.access_token() {
            builder = builder.bearer_auth(token);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let builder = match &request.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(value),
            Body::Multipart(form) => builder.multipart(
                form.to_form()
                    .map_err(|e| ApiError::InvalidRequest(e.to_string()))?,
            ),
            Body::Invalid(reason) => return Err(ApiError::InvalidRequest(reason.clone())),
        };
        Ok(builder)
    }

    /// Apply the side effects for a failed call and hand the error back.
    pub(crate) fn reject(&self, error: ApiError) -> ApiError {
        warn!(error = %error, "request rejected");
        if matches!(error, ApiError::Unauthorized { .. }) {
            self.expire_session();
        }
        if let Some(notice) = error.notice() {
            self.notifier.notify(notice);
        }
        error
    }

    fn expire_session(&self) {
        if let Err(e) = self.storage.clear_credentials() {
            warn!(error = %e, "failed to clear credentials after 401");
        }
        self.navigator.push(LOGIN_PATH);
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
