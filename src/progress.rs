//! Ingestion progress reporting.
//!
//! Reports per-file progress during `rag upload` (and `/upload` in the chat
//! shell) so users see which file is in flight and how the batch ended.
//! Progress is emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event for a batch submission.
#[derive(Clone, Debug, PartialEq)]
pub enum IngestProgressEvent {
    /// Item `index` (1-based) of `total` moved to uploading.
    Started {
        id: String,
        name: String,
        index: usize,
        total: usize,
    },
    /// Cosmetic percentage while the upload is outstanding.
    Progress { id: String, name: String, percent: u8 },
    Succeeded {
        id: String,
        name: String,
        document_count: u64,
    },
    Failed {
        id: String,
        name: String,
        message: String,
    },
    /// Every item reached a terminal state.
    Finished { succeeded: usize, failed: usize },
}

/// Reports ingestion progress. Implementations write to stderr (human or JSON).
pub trait IngestProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the ingestion pipeline.
    fn report(&self, event: IngestProgressEvent);
}

/// Human-friendly progress on stderr: "upload report.pdf  [1/3]  40%".
pub struct StderrProgress;

impl IngestProgressReporter for StderrProgress {
    fn report(&self, event: IngestProgressEvent) {
        let line = match &event {
            IngestProgressEvent::Started {
                name, index, total, ..
            } => format!("upload {}  [{}/{}]  uploading...\n", name, index, total),
            IngestProgressEvent::Progress { name, percent, .. } => {
                format!("upload {}  {}%\n", name, percent)
            }
            IngestProgressEvent::Succeeded {
                name,
                document_count,
                ..
            } => format!("upload {}  done ({} chunks)\n", name, document_count),
            IngestProgressEvent::Failed { name, message, .. } => {
                format!("upload {}  failed: {}\n", name, message)
            }
            IngestProgressEvent::Finished { succeeded, failed } => {
                format!("upload finished  {} ok, {} failed\n", succeeded, failed)
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl IngestProgressReporter for JsonProgress {
    fn report(&self, event: IngestProgressEvent) {
        let obj = match &event {
            IngestProgressEvent::Started {
                id,
                name,
                index,
                total,
            } => serde_json::json!({
                "event": "started", "id": id, "name": name, "index": index, "total": total
            }),
            IngestProgressEvent::Progress { id, name, percent } => serde_json::json!({
                "event": "progress", "id": id, "name": name, "percent": percent
            }),
            IngestProgressEvent::Succeeded {
                id,
                name,
                document_count,
            } => serde_json::json!({
                "event": "succeeded", "id": id, "name": name, "document_count": document_count
            }),
            IngestProgressEvent::Failed { id, name, message } => serde_json::json!({
                "event": "failed", "id": id, "name": name, "message": message
            }),
            IngestProgressEvent::Finished { succeeded, failed } => serde_json::json!({
                "event": "finished", "succeeded": succeeded, "failed": failed
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl IngestProgressReporter for NoProgress {
    fn report(&self, _event: IngestProgressEvent) {}
}

/// Format a byte count as megabytes with two decimals ("1.50 MB").
pub fn format_size_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode. Caller passes it to the pipeline.
    pub fn reporter(&self) -> Box<dyn IngestProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
