//! Backend error types.

use http::StatusCode;
use thiserror::Error;

/// Errors returned by backend calls.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend could not be reached (refused, DNS, timeout).
    #[error("connection error: {0}")]
    Connection(String),

    /// The backend answered 2xx with no content.
    #[error("empty response: {0}")]
    EmptyResponse(String),

    #[error("{status} for url: {url}")]
    Http { status: StatusCode, url: String },

    #[error("{0}")]
    Other(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Coarse classification of a [`BackendError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    EmptyResponse,
    Http(StatusCode),
    Unclassified,
}

impl BackendError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BackendError::Connection(_) => ErrorKind::Connection,
            BackendError::EmptyResponse(_) => ErrorKind::EmptyResponse,
            BackendError::Http { status, .. } => ErrorKind::Http(*status),
            BackendError::Other(_) => ErrorKind::Unclassified,
        }
    }

    /// HTTP status of the failed response, if there was one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            BackendError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the backend rejected the request itself (HTTP 400-499).
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|s| s.is_client_error())
    }

    /// Whether a lazy result sequence should treat this error as its end.
    pub fn ends_stream(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Unclassified)
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            return BackendError::Connection(e.to_string());
        }
        match e.status() {
            Some(status) => BackendError::Http {
                status,
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            },
            None => BackendError::Other(e.to_string()),
        }
    }
}
