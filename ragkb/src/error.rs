//! Error taxonomy for API calls.

use reqwest::StatusCode;
use thiserror::Error;

use crate::notify::Notice;
use crate::storage::StorageError;

pub const SESSION_EXPIRED: &str = "Session expired, please log in again";
pub const FORBIDDEN: &str = "You do not have permission to access this resource";
pub const NOT_FOUND: &str = "The requested resource does not exist";
pub const SERVER_FAULT: &str = "Server error, please try again later";
pub const REQUEST_FAILED: &str = "Request failed";
pub const NETWORK_FAILURE: &str = "Network error, please check your connection";
pub const INVALID_REQUEST: &str = "Invalid request configuration";

fn detail(message: Option<&String>) -> &str {
    message.map_or("no details", String::as_str)
}

/// Failure of a single API call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 401: credentials missing, invalid or expired.
    #[error("unauthorized: {}", detail(.message.as_ref()))]
    Unauthorized { message: Option<String> },

    /// 403: authenticated but not allowed.
    #[error("forbidden: {}", detail(.message.as_ref()))]
    Forbidden { message: Option<String> },

    /// 404.
    #[error("not found: {}", detail(.message.as_ref()))]
    NotFound { message: Option<String> },

    /// 500, any other non-2xx status, or a 2xx envelope with a non-zero code.
    #[error("server error ({status}): {}", detail(.message.as_ref()))]
    Server { status: u16, message: Option<String> },

    /// No response was received.
    #[error("network error: {0}")]
    Network(String),

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A 2xx response whose body did not match the endpoint's schema.
    #[error("unexpected response payload: {0}")]
    Decode(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// Classify a non-2xx status.
    pub fn from_status(status: StatusCode, message: Option<String>) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized { message },
            StatusCode::FORBIDDEN => Self::Forbidden { message },
            StatusCode::NOT_FOUND => Self::NotFound { message },
            _ => Self::Server {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// HTTP status that produced the error, if any.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-provided message, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { message }
            | Self::Forbidden { message }
            | Self::NotFound { message }
            | Self::Server { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// The notice shown to the user for this failure.
    ///
    /// Decode and storage failures are internal and only logged.
    pub fn notice(&self) -> Option<Notice> {
        let message = match self {
            Self::Unauthorized { .. } => SESSION_EXPIRED,
            Self::Forbidden { .. } => FORBIDDEN,
            Self::NotFound { .. } => NOT_FOUND,
            Self::Server { status: 500, .. } => SERVER_FAULT,
            Self::Server { message, .. } => {
                return Some(Notice::error(
                    message.as_deref().unwrap_or(REQUEST_FAILED),
                ))
            }
            Self::Network(_) => NETWORK_FAILURE,
            Self::InvalidRequest(_) => INVALID_REQUEST,
            Self::Decode(_) | Self::Storage(_) => return None,
        };
        Some(Notice::error(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_statuses() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, None),
            ApiError::Unauthorized { .. }
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::FORBIDDEN, None),
            ApiError::Forbidden { .. }
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, None),
            ApiError::NotFound { .. }
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_REQUEST, None),
            ApiError::Server { status: 400, .. }
        ));
    }

    #[test]
    fn notices_are_status_specific() {
        let notice = |e: ApiError| e.notice().map(|n| n.message);

        assert_eq!(
            notice(ApiError::Unauthorized { message: None }).as_deref(),
            Some(SESSION_EXPIRED)
        );
        assert_eq!(
            notice(ApiError::Server {
                status: 500,
                message: Some("db down".into())
            })
            .as_deref(),
            Some(SERVER_FAULT)
        );
        assert_eq!(
            notice(ApiError::Server {
                status: 400,
                message: Some("name is required".into())
            })
            .as_deref(),
            Some("name is required")
        );
        assert_eq!(
            notice(ApiError::Server {
                status: 409,
                message: None
            })
            .as_deref(),
            Some(REQUEST_FAILED)
        );
        assert_eq!(
            notice(ApiError::Network("refused".into())).as_deref(),
            Some(NETWORK_FAILURE)
        );
        assert_eq!(notice(ApiError::Decode("bad".into())), None);
    }

    #[test]
    fn display_includes_server_message() {
        let err = ApiError::Forbidden {
            message: Some("admin access required".into()),
        };
        assert_eq!(err.to_string(), "forbidden: admin access required");
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.server_message(), Some("admin access required"));
    }
}
