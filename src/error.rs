//! Error types for the client orchestration layer.
//!
//! Two layers of errors exist:
//!
//! - [`BackendError`]: what the transport reports (network failure, a
//!   non-success HTTP status, an undecodable body).
//! - [`ClientError`]: the domain taxonomy surfaced to callers and the
//!   display layer. Transport errors are converted at the operation boundary
//!   (health probe, file submission, query dispatch); none of them is fatal.

use reqwest::StatusCode;

/// Failure reported by a [`RagBackend`](crate::backend::RagBackend).
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The request never produced a response (refused, reset, timed out).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    /// The server answered with a success status but an unexpected body.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Network(err.to_string())
        }
    }
}

/// Domain error surfaced by the session and its components.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The RAG service is unreachable or has not been probed successfully.
    #[error("cannot connect to RAG API server: {0}")]
    Connectivity(String),

    /// A required field was empty; nothing was submitted.
    #[error("{0}")]
    Validation(String),

    /// One file failed ingestion. Other items in the batch are unaffected.
    #[error("Error indexing {name}: {message}")]
    IngestionItem { name: String, message: String },

    /// A conversational turn failed.
    #[error("{0}")]
    Query(String),

    /// A query is already in flight; the call was rejected without side effects.
    #[error("a query is already in progress")]
    Busy,
}

impl ClientError {
    /// Whether the error should be shown next to the offending input rather
    /// than as a banner.
    pub fn is_inline(&self) -> bool {
        matches!(self, ClientError::Validation(_) | ClientError::Busy)
    }
}
