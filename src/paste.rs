//! Pasted-text ingestion.
//!
//! The RAG service only accepts PDF uploads, so a text submission is not sent
//! anywhere: after an artificial processing delay a result is synthesized
//! locally. Replace [`ContentSubmission::submit`] with a real call once the
//! service exposes a text ingestion endpoint.

use std::time::Duration;

use crate::error::ClientError;
use crate::models::IngestionResult;

pub const TEXT_COLLECTION: &str = "text_collection";
const PREVIEW_CHARS: usize = 100;

/// Form state for the paste workflow.
#[derive(Debug, Clone)]
pub struct ContentSubmission {
    title: String,
    content: String,
    delay: Duration,
}

impl ContentSubmission {
    pub fn new(delay: Duration) -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            delay,
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn clear(&mut self) {
        self.title.clear();
        self.content.clear();
    }

    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }

    /// Whether both fields carry non-whitespace text.
    pub fn is_ready(&self) -> bool {
        !self.title.trim().is_empty() && !self.content.trim().is_empty()
    }

    /// Submit the current title and content.
    ///
    /// Fails with [`ClientError::Validation`] when either field is blank,
    /// leaving the form untouched. On success the form is cleared.
    pub async fn submit(&mut self) -> Result<IngestionResult, ClientError> {
        if !self.is_ready() {
            return Err(ClientError::Validation(
                "Please provide both title and content".to_string(),
            ));
        }

        tracing::info!(
            title = %self.title.trim(),
            "no text ingestion endpoint; synthesizing result locally"
        );
        tokio::time::sleep(self.delay).await;

        let result = IngestionResult {
            document_count: 1,
            collection_name: Some(TEXT_COLLECTION.to_string()),
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
            preview: Some(preview(&self.content)),
        };
        self.clear();
        Ok(result)
    }
}

fn preview(content: &str) -> String {
    let head: String = content.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", head)
}
