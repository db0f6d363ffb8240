//! Batched PDF ingestion.
//!
//! Files are queued as [`IngestionItem`]s and submitted one at a time, in
//! insertion order, to the indexing endpoint. Each item moves through
//! `Pending → Uploading → Success | Error`; a failed item never aborts the
//! rest of the batch and there is no batch-level rollback.
//!
//! While an upload is outstanding the item's progress is advanced
//! synthetically (the transport reports no byte-level progress). The ticker
//! lives inside the same `select!` loop as the request future, so it stops on
//! every exit path without explicit teardown.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::backend::RagBackend;
use crate::config::IngestConfig;
use crate::error::ClientError;
use crate::models::IngestionResult;
use crate::progress::{IngestProgressEvent, IngestProgressReporter};

/// Where the bytes of a queued file come from.
#[derive(Debug, Clone)]
enum FileSource {
    Path(PathBuf),
    Memory(Vec<u8>),
}

/// Opaque handle to a file chosen for upload.
#[derive(Debug, Clone)]
pub struct PendingFile {
    name: String,
    size: u64,
    source: FileSource,
}

impl PendingFile {
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let size = std::fs::metadata(path)?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            size,
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            source: FileSource::Memory(bytes),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_pdf(&self) -> bool {
        Path::new(&self.name)
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false)
    }

    async fn read(&self) -> std::io::Result<Vec<u8>> {
        match &self.source {
            FileSource::Path(path) => tokio::fs::read(path).await,
            FileSource::Memory(bytes) => Ok(bytes.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Pending,
    Uploading,
    Success,
    Error,
}

impl ItemState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ItemState::Success | ItemState::Error)
    }
}

#[derive(Debug, Clone)]
pub struct IngestionItem {
    id: String,
    file: PendingFile,
    state: ItemState,
    progress: u8,
    error: Option<String>,
}

impl IngestionItem {
    fn new(file: PendingFile) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            file,
            state: ItemState::Pending,
            progress: 0,
            error: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.file.name()
    }

    pub fn size(&self) -> u64 {
        self.file.size()
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Snapshot for the display layer.
    pub fn view(&self) -> ItemView {
        ItemView {
            id: self.id.clone(),
            name: self.file.name.clone(),
            size: self.file.size,
            state: self.state,
            progress: self.progress,
            error: self.error.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemView {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub state: ItemState,
    pub progress: u8,
    pub error: Option<String>,
}

#[derive(Debug)]
pub enum ItemOutcome {
    Indexed(IngestionResult),
    Failed(ClientError),
}

/// Per-item outcomes of one `submit_all`, in submission order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<(String, ItemOutcome)>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, ItemOutcome::Indexed(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn summary(&self) -> String {
        format!(
            "All files processed: {} succeeded, {} failed",
            self.succeeded(),
            self.failed()
        )
    }
}

pub struct IngestionPipeline {
    items: Vec<IngestionItem>,
    settings: IngestConfig,
}

impl IngestionPipeline {
    pub fn new(settings: IngestConfig) -> Self {
        Self {
            items: Vec::new(),
            settings,
        }
    }

    /// Queue files as `Pending` items and return their identifiers.
    ///
    /// Non-PDF inputs are skipped. An empty input is a no-op.
    pub fn enqueue(&mut self, files: impl IntoIterator<Item = PendingFile>) -> Vec<String> {
        let mut ids = Vec::new();
        for file in files {
            if !file.is_pdf() {
                tracing::warn!(file = file.name(), "skipping non-PDF file");
                continue;
            }
            let item = IngestionItem::new(file);
            tracing::debug!(id = %item.id, file = item.name(), "queued for ingestion");
            ids.push(item.id.clone());
            self.items.push(item);
        }
        ids
    }

    /// Remove an item by id. Items that are currently uploading are kept.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.items.iter().position(|item| item.id == id) {
            Some(pos) if self.items[pos].state == ItemState::Uploading => false,
            Some(pos) => {
                self.items.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Drop every item that reached `Success`, returning how many went.
    ///
    /// Keeps failed items queued so the next `submit_all` retries them
    /// without sending already indexed files again.
    pub fn clear_indexed(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|item| item.state != ItemState::Success);
        before - self.items.len()
    }

    pub fn items(&self) -> &[IngestionItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&IngestionItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn views(&self) -> Vec<ItemView> {
        self.items.iter().map(IngestionItem::view).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Submit every item sequentially in batch order.
    ///
    /// `on_outcome` is invoked as soon as each item reaches a terminal state.
    /// Returns once every item is `Success` or `Error`.
    pub async fn submit_all(
        &mut self,
        backend: &dyn RagBackend,
        reporter: &dyn IngestProgressReporter,
        on_outcome: &mut (dyn FnMut(&IngestionItem, &ItemOutcome) + Send),
    ) -> BatchReport {
        let total = self.items.len();
        let mut report = BatchReport::default();

        for (i, item) in self.items.iter_mut().enumerate() {
            item.state = ItemState::Uploading;
            item.progress = 0;
            item.error = None;
            tracing::info!(id = %item.id, file = item.name(), "uploading");
            reporter.report(IngestProgressEvent::Started {
                id: item.id.clone(),
                name: item.name().to_string(),
                index: i + 1,
                total,
            });

            let outcome = match upload(backend, &self.settings, item, reporter).await {
                Ok(result) => {
                    item.state = ItemState::Success;
                    item.progress = 100;
                    tracing::info!(
                        id = %item.id,
                        file = item.name(),
                        document_count = result.document_count,
                        "indexed"
                    );
                    reporter.report(IngestProgressEvent::Succeeded {
                        id: item.id.clone(),
                        name: item.name().to_string(),
                        document_count: result.document_count,
                    });
                    ItemOutcome::Indexed(result)
                }
                Err(message) => {
                    item.state = ItemState::Error;
                    item.progress = 0;
                    item.error = Some(message.clone());
                    tracing::warn!(id = %item.id, file = item.name(), error = %message, "indexing failed");
                    reporter.report(IngestProgressEvent::Failed {
                        id: item.id.clone(),
                        name: item.name().to_string(),
                        message: message.clone(),
                    });
                    ItemOutcome::Failed(ClientError::IngestionItem {
                        name: item.name().to_string(),
                        message,
                    })
                }
            };

            on_outcome(item, &outcome);
            report.outcomes.push((item.id.clone(), outcome));
        }

        reporter.report(IngestProgressEvent::Finished {
            succeeded: report.succeeded(),
            failed: report.failed(),
        });
        report
    }
}

/// Upload one item, ticking its cosmetic progress until the request resolves.
async fn upload(
    backend: &dyn RagBackend,
    settings: &IngestConfig,
    item: &mut IngestionItem,
    reporter: &dyn IngestProgressReporter,
) -> Result<IngestionResult, String> {
    let bytes = item
        .file
        .read()
        .await
        .map_err(|e| format!("failed to read file: {}", e))?;
    let name = item.name().to_string();

    let request = backend.index_pdf(&name, bytes);
    tokio::pin!(request);

    let mut ticker = tokio::time::interval(settings.progress_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    let result = loop {
        tokio::select! {
            biased;
            res = &mut request => break res,
            _ = ticker.tick() => {
                let next = advance(item.progress, settings.progress_step, settings.progress_ceiling);
                if next != item.progress {
                    item.progress = next;
                    reporter.report(IngestProgressEvent::Progress {
                        id: item.id.clone(),
                        name: name.clone(),
                        percent: next,
                    });
                }
            }
        }
    };

    result.map_err(|e| e.to_string())
}

fn advance(current: u8, step: u8, ceiling: u8) -> u8 {
    current.saturating_add(step).min(ceiling).max(current)
}
