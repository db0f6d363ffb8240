//! Plain-text rendering of the read-only views the session exposes.

use std::fmt::Write as _;

use crate::health::HealthStatus;
use crate::ingest::{ItemState, ItemView};
use crate::progress::format_size_mb;
use crate::transcript::{ChatMessage, MessageKind};

pub fn render_items(items: &[ItemView]) -> String {
    let mut out = format!(
        "{:<10} {:<32} {:>10} {:<10} {:>8}\n",
        "ID", "FILE", "SIZE", "STATE", "PROGRESS"
    );
    for item in items {
        let state = match item.state {
            ItemState::Pending => "pending",
            ItemState::Uploading => "uploading",
            ItemState::Success => "success",
            ItemState::Error => "error",
        };
        let short_id: String = item.id.chars().take(8).collect();
        let _ = writeln!(
            out,
            "{:<10} {:<32} {:>10} {:<10} {:>7}%",
            short_id,
            item.name,
            format_size_mb(item.size),
            state,
            item.progress
        );
        if let Some(err) = &item.error {
            let _ = writeln!(out, "{:<10} ! {}", "", err);
        }
    }
    out
}

pub fn render_message(message: &ChatMessage) -> String {
    let time = message.timestamp.with_timezone(&chrono::Local).format("%H:%M:%S");
    let who = match message.kind {
        MessageKind::User => "you",
        MessageKind::Assistant { .. } => "assistant",
        MessageKind::Error => "error",
    };
    let mut out = format!("[{}] {}:\n{}\n", time, who, message.content.trim_end());
    if let Some(line) = message.metadata_line() {
        let _ = writeln!(out, "  ({})", line);
    }
    out
}

pub fn render_transcript(messages: &[ChatMessage]) -> String {
    if messages.is_empty() {
        return "No messages yet. Ask a question about your indexed documents.\n".to_string();
    }
    messages
        .iter()
        .map(render_message)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Banner shown while the service is unreachable.
pub fn connection_banner(status: HealthStatus) -> Option<&'static str> {
    if status.is_connected() {
        None
    } else {
        Some("Warning: Cannot connect to RAG API server. Type /retry to check again.")
    }
}
