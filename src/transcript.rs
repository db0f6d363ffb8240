//! Append-only conversation log.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;

use crate::models::ResponseMetadata;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageKind {
    User,
    Assistant {
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<ResponseMetadata>,
    },
    Error,
}

/// One transcript entry. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub id: u64,
    #[serde(flatten)]
    pub kind: MessageKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn is_user(&self) -> bool {
        matches!(self.kind, MessageKind::User)
    }

    pub fn is_assistant(&self) -> bool {
        matches!(self.kind, MessageKind::Assistant { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, MessageKind::Error)
    }

    /// Assistant content is markdown; everything else is plain text.
    pub fn renders_markdown(&self) -> bool {
        self.is_assistant()
    }

    pub fn metadata(&self) -> Option<&ResponseMetadata> {
        match &self.kind {
            MessageKind::Assistant { metadata } => metadata.as_ref(),
            _ => None,
        }
    }

    /// The footer shown under an assistant answer, e.g.
    /// `2 documents found | Sources: policy.pdf | 120ms`.
    pub fn metadata_line(&self) -> Option<String> {
        let meta = self.metadata()?;
        let mut line = format!("{} documents found", meta.documents_found);
        if !meta.sources.is_empty() {
            let _ = write!(line, " | Sources: {}", meta.sources.join(", "));
        }
        if !meta.processing_time.is_empty() {
            let _ = write!(line, " | {}", meta.processing_time);
        }
        Some(line)
    }
}

#[derive(Debug, Default)]
pub struct ChatTranscript {
    messages: Vec<ChatMessage>,
    next_id: u64,
}

impl ChatTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> ChatMessage {
        self.push(MessageKind::User, content.into())
    }

    pub fn push_assistant(
        &mut self,
        content: impl Into<String>,
        metadata: Option<ResponseMetadata>,
    ) -> ChatMessage {
        self.push(MessageKind::Assistant { metadata }, content.into())
    }

    pub fn push_error(&mut self, content: impl Into<String>) -> ChatMessage {
        self.push(MessageKind::Error, content.into())
    }

    fn push(&mut self, kind: MessageKind, content: String) -> ChatMessage {
        self.next_id += 1;
        let message = ChatMessage {
            id: self.next_id,
            kind,
            content,
            timestamp: Utc::now(),
        };
        self.messages.push(message.clone());
        message
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
