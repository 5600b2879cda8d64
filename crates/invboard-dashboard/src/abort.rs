//! Mapping backend failures onto HTTP responses.
//!
//! Handlers wrap backend calls in [`get_or_abort`] (or
//! [`get_or_abort_except_client_errors`]) and propagate the resulting
//! [`Failure`] with `?`. Every failure is logged here, once.
//!
//! | Backend error | Outcome |
//! |---|---|
//! | `Http` 400-499, client errors requested | `ClientError` (warn) |
//! | `Http` any other status | abort with that status |
//! | `Connection` | abort 500 |
//! | `EmptyResponse` | abort 204 |
//! | `Other` | abort 500 |

use std::future::Future;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use invboard_client::{BackendError, BackendResult};

/// Terminate the current request with a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Abort(pub StatusCode);

impl Abort {
    pub fn status(&self) -> StatusCode {
        self.0
    }
}

impl IntoResponse for Abort {
    fn into_response(self) -> Response {
        match self.0.canonical_reason() {
            Some(reason) if self.0 != StatusCode::NO_CONTENT => (self.0, reason).into_response(),
            _ => self.0.into_response(),
        }
    }
}

/// Why a wrapped backend call did not produce a value.
#[derive(Debug)]
pub enum Failure {
    Abort(Abort),
    /// The backend rejected the request (HTTP 400-499); left to the
    /// caller so it can explain the problem to the user.
    ClientError(BackendError),
}

impl Failure {
    /// Status the response will carry.
    pub fn status(&self) -> StatusCode {
        match self {
            Failure::Abort(abort) => abort.status(),
            Failure::ClientError(e) => e.status().unwrap_or(StatusCode::BAD_REQUEST),
        }
    }
}

impl From<Abort> for Failure {
    fn from(abort: Abort) -> Self {
        Failure::Abort(abort)
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        match self {
            Failure::Abort(abort) => abort.into_response(),
            Failure::ClientError(e) => {
                let status = e.status().unwrap_or(StatusCode::BAD_REQUEST);
                (status, e.to_string()).into_response()
            }
        }
    }
}

/// Await a backend call, aborting the request on any failure.
pub async fn get_or_abort<T, F>(call: F) -> Result<T, Failure>
where
    F: Future<Output = BackendResult<T>>,
{
    do_get_or_abort(false, call).await
}

/// Like [`get_or_abort`], but backend client errors (HTTP 400-499) are
/// handed back as [`Failure::ClientError`] instead of aborting.
pub async fn get_or_abort_except_client_errors<T, F>(call: F) -> Result<T, Failure>
where
    F: Future<Output = BackendResult<T>>,
{
    do_get_or_abort(true, call).await
}

async fn do_get_or_abort<T, F>(reraise_client_error: bool, call: F) -> Result<T, Failure>
where
    F: Future<Output = BackendResult<T>>,
{
    call.await.map_err(|e| classify(reraise_client_error, e))
}

fn classify(reraise_client_error: bool, err: BackendError) -> Failure {
    let status = match &err {
        BackendError::Http { status, .. } => {
            if reraise_client_error && status.is_client_error() {
                warn!(error = %err, "backend rejected request");
                return Failure::ClientError(err);
            }
            *status
        }
        BackendError::Connection(_) => StatusCode::INTERNAL_SERVER_ERROR,
        BackendError::EmptyResponse(_) => StatusCode::NO_CONTENT,
        BackendError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error!(error = %err, status = status.as_u16(), "backend call failed");
    Failure::Abort(Abort(status))
}
