//! Transport seam between the client and the remote RAG service.
//!
//! [`RagBackend`] is the contract the orchestration layer depends on;
//! [`HttpBackend`] implements it over HTTP with `reqwest`.
//!
//! # Endpoints
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | `GET`  | `/health` | none |
//! | `POST` | `/api/indexing/pdf` | multipart, single file field `pdf` |
//! | `POST` | `/api/retrieval/query` | JSON `{ query, options }` |
//!
//! Failures come back as `{ "error": "..." }` with a non-success status.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use std::time::Duration;

use crate::config::ServerConfig;
use crate::error::BackendError;
use crate::models::{
    error_message, Envelope, IndexingData, IngestionResult, QueryAnswer, QueryData, QueryRequest,
};

pub const HEALTH_PATH: &str = "/health";
pub const INDEXING_PATH: &str = "/api/indexing/pdf";
pub const RETRIEVAL_PATH: &str = "/api/retrieval/query";

/// Multipart field name the indexing endpoint expects.
pub const PDF_FIELD: &str = "pdf";

/// Operations the client needs from the RAG service.
#[async_trait]
pub trait RagBackend: Send + Sync {
    /// Succeeds when the service answers its health endpoint with a
    /// success status.
    async fn health(&self) -> Result<(), BackendError>;

    /// Upload one PDF for indexing.
    async fn index_pdf(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<IngestionResult, BackendError>;

    /// Ask a question against the indexed content.
    async fn query(&self, request: &QueryRequest) -> Result<QueryAnswer, BackendError>;
}

/// HTTP implementation of [`RagBackend`].
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    health_timeout: Duration,
}

impl HttpBackend {
    pub fn new(config: &ServerConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            health_timeout: config.health_timeout(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl RagBackend for HttpBackend {
    async fn health(&self) -> Result<(), BackendError> {
        let url = self.url(HEALTH_PATH);
        tracing::debug!(%url, "probing health endpoint");
        let response = self
            .client
            .get(&url)
            .timeout(self.health_timeout)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(BackendError::Status {
                status,
                message: format!("health check returned {}", status),
            })
        }
    }

    async fn index_pdf(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<IngestionResult, BackendError> {
        let url = self.url(INDEXING_PATH);
        tracing::debug!(%url, file = file_name, bytes = bytes.len(), "uploading pdf");

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let form = Form::new().part(PDF_FIELD, part);

        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(response, status, "Indexing failed").await);
        }

        let envelope: Envelope<IndexingData> = decode(response).await?;
        Ok(envelope.data.into())
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryAnswer, BackendError> {
        let url = self.url(RETRIEVAL_PATH);
        tracing::debug!(%url, model = %request.options.model, "dispatching query");

        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(response, status, "Failed to get response").await);
        }

        let envelope: Envelope<QueryData> = decode(response).await?;
        Ok(envelope.data.into())
    }
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| BackendError::Decode(e.to_string()))
}

/// Build a [`BackendError::Status`] from a failed response, preferring the
/// server's own `error` message.
async fn status_error(response: Response, status: StatusCode, fallback: &str) -> BackendError {
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|json| error_message(&json))
        .unwrap_or_else(|| format!("{} (HTTP {})", fallback, status.as_u16()));
    BackendError::Status { status, message }
}
