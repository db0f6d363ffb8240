//! Top-level client session.
//!
//! A [`Session`] owns the connection monitor (and therefore the health
//! signal), the ingestion pipeline, the paste form and the query dispatcher.
//! It tracks which workflow is active and a single transient status line,
//! overwritten by the most recent event from any component.
//!
//! After a successful ingestion the session switches to [`Workflow::Chat`]
//! once a short display delay has passed. Selecting a workflow explicitly
//! cancels a pending switch.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::backend::RagBackend;
use crate::config::Config;
use crate::error::ClientError;
use crate::health::{ConnectionMonitor, HealthSignal, HealthStatus};
use crate::ingest::{BatchReport, IngestionPipeline, ItemOutcome, PendingFile};
use crate::models::IngestionResult;
use crate::paste::ContentSubmission;
use crate::progress::IngestProgressReporter;
use crate::query::QueryDispatcher;
use crate::transcript::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Workflow {
    IngestFile,
    IngestText,
    Chat,
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Workflow::IngestFile => "upload",
            Workflow::IngestText => "paste",
            Workflow::Chat => "chat",
        })
    }
}

impl FromStr for Workflow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" | "upload" => Ok(Workflow::IngestFile),
            "text" | "paste" => Ok(Workflow::IngestText),
            "chat" => Ok(Workflow::Chat),
            other => Err(format!(
                "unknown workflow '{}': expected file, text, or chat",
                other
            )),
        }
    }
}

pub struct Session {
    backend: Arc<dyn RagBackend>,
    monitor: ConnectionMonitor,
    health: HealthSignal,
    pipeline: IngestionPipeline,
    paste: ContentSubmission,
    dispatcher: QueryDispatcher,
    workflow: Arc<watch::Sender<Workflow>>,
    pending_switch: Option<JoinHandle<()>>,
    status: String,
    transition_delay: Duration,
}

impl Session {
    pub fn new(config: &Config, backend: Arc<dyn RagBackend>) -> Self {
        let monitor = ConnectionMonitor::new(backend.clone(), config.server.health_timeout());
        let health = monitor.signal();
        let dispatcher =
            QueryDispatcher::new(backend.clone(), monitor.signal(), config.query.clone());
        let (workflow, _) = watch::channel(Workflow::IngestFile);

        Self {
            backend,
            monitor,
            health,
            pipeline: IngestionPipeline::new(config.ingest.clone()),
            paste: ContentSubmission::new(config.session.paste_delay()),
            dispatcher,
            workflow: Arc::new(workflow),
            pending_switch: None,
            status: String::new(),
            transition_delay: config.session.transition_delay(),
        }
    }

    // ============ Connection ============

    /// Probe the service. Used on startup and for manual retries.
    pub async fn check_connection(&self) -> HealthStatus {
        self.monitor.probe().await
    }

    pub fn health(&self) -> HealthStatus {
        self.health.current()
    }

    fn require_connection(&self) -> Result<(), ClientError> {
        if self.health.is_connected() {
            Ok(())
        } else {
            Err(ClientError::Connectivity(format!(
                "status is {}",
                self.health.current()
            )))
        }
    }

    // ============ Workflow & status ============

    pub fn workflow(&self) -> Workflow {
        *self.workflow.borrow()
    }

    pub fn subscribe_workflow(&self) -> watch::Receiver<Workflow> {
        self.workflow.subscribe()
    }

    /// Explicit user selection. Cancels any scheduled switch to chat.
    pub fn select_workflow(&mut self, workflow: Workflow) {
        if let Some(handle) = self.pending_switch.take() {
            handle.abort();
        }
        self.workflow.send_replace(workflow);
    }

    pub fn has_pending_switch(&self) -> bool {
        self.pending_switch
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    fn set_status(status: &mut String, message: impl Into<String>) {
        *status = message.into();
        tracing::info!(status = %status, "status");
    }

    // ============ File ingestion ============

    pub fn pipeline(&self) -> &IngestionPipeline {
        &self.pipeline
    }

    pub fn enqueue_files(&mut self, files: impl IntoIterator<Item = PendingFile>) -> Vec<String> {
        self.pipeline.enqueue(files)
    }

    pub fn remove_file(&mut self, id: &str) -> bool {
        self.pipeline.remove(id)
    }

    /// Drop files that were indexed successfully so later batches skip them.
    pub fn clear_indexed_files(&mut self) -> usize {
        self.pipeline.clear_indexed()
    }

    /// Submit every queued file. Each success schedules the switch to chat.
    pub async fn index_files(
        &mut self,
        reporter: &dyn IngestProgressReporter,
    ) -> Result<BatchReport, ClientError> {
        self.require_connection()?;
        if self.pipeline.is_empty() {
            return Ok(BatchReport::default());
        }

        Self::set_status(&mut self.status, "Indexing files...");

        let status = &mut self.status;
        let pending_switch = &mut self.pending_switch;
        let workflow = &self.workflow;
        let delay = self.transition_delay;

        let report = self
            .pipeline
            .submit_all(self.backend.as_ref(), reporter, &mut |item, outcome| {
                match outcome {
                    ItemOutcome::Indexed(result) => {
                        Self::set_status(
                            status,
                            format!(
                                "Successfully indexed {} document chunks",
                                result.document_count
                            ),
                        );
                        schedule_switch(pending_switch, workflow, delay);
                    }
                    ItemOutcome::Failed(_) => {
                        Self::set_status(
                            status,
                            format!(
                                "Error indexing {}: {}",
                                item.name(),
                                item.error().unwrap_or("Indexing failed")
                            ),
                        );
                    }
                }
            })
            .await;

        Self::set_status(&mut self.status, report.summary());
        Ok(report)
    }

    // ============ Text ingestion ============

    pub fn paste(&self) -> &ContentSubmission {
        &self.paste
    }

    pub fn paste_mut(&mut self) -> &mut ContentSubmission {
        &mut self.paste
    }

    /// Clear the paste form together with the status line.
    pub fn clear_paste(&mut self) {
        self.paste.clear();
        self.status.clear();
    }

    /// Fill the paste form and submit it.
    pub async fn submit_text(
        &mut self,
        title: &str,
        content: &str,
    ) -> Result<IngestionResult, ClientError> {
        self.paste.set_title(title);
        self.paste.set_content(content);
        self.submit_paste().await
    }

    /// Submit whatever the paste form currently holds.
    pub async fn submit_paste(&mut self) -> Result<IngestionResult, ClientError> {
        if !self.paste.is_ready() {
            Self::set_status(&mut self.status, "Please provide both title and content");
            return Err(ClientError::Validation(
                "Please provide both title and content".to_string(),
            ));
        }
        self.require_connection()?;

        Self::set_status(&mut self.status, "Processing pasted content...");
        match self.paste.submit().await {
            Ok(result) => {
                Self::set_status(&mut self.status, "Successfully indexed pasted content");
                schedule_switch(&mut self.pending_switch, &self.workflow, self.transition_delay);
                Ok(result)
            }
            Err(e) => {
                Self::set_status(&mut self.status, format!("Error processing content: {}", e));
                Err(e)
            }
        }
    }

    // ============ Chat ============

    /// Reason of the last failed question, cleared when the next one starts.
    pub fn last_error(&self) -> Option<String> {
        self.dispatcher.last_error()
    }

    pub async fn ask(&self, query: &str) -> Result<ChatMessage, ClientError> {
        self.dispatcher.ask(query).await
    }

    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.dispatcher.transcript()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(handle) = self.pending_switch.take() {
            handle.abort();
        }
    }
}

/// Replace any pending switch with a new one firing after `delay`.
fn schedule_switch(
    slot: &mut Option<JoinHandle<()>>,
    workflow: &Arc<watch::Sender<Workflow>>,
    delay: Duration,
) {
    if let Some(previous) = slot.take() {
        previous.abort();
    }
    let workflow = Arc::clone(workflow);
    *slot = Some(tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        workflow.send_replace(Workflow::Chat);
        tracing::debug!("switched to chat");
    }));
}
