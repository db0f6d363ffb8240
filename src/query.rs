//! Conversational query dispatch.
//!
//! [`QueryDispatcher::ask`] appends the user's turn to the transcript, sends
//! it to the retrieval endpoint with the configured [`QueryOptions`], and
//! appends either the assistant's answer or an error entry. At most one
//! query is in flight; a second call while one is pending is rejected
//! before it touches the transcript.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::backend::RagBackend;
use crate::error::ClientError;
use crate::health::HealthSignal;
use crate::models::{QueryOptions, QueryRequest};
use crate::transcript::{ChatMessage, ChatTranscript};

pub struct QueryDispatcher {
    backend: Arc<dyn RagBackend>,
    health: HealthSignal,
    options: QueryOptions,
    transcript: Mutex<ChatTranscript>,
    in_flight: AtomicBool,
    last_error: Mutex<Option<String>>,
}

/// Clears the in-flight flag when the dispatch ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl QueryDispatcher {
    pub fn new(backend: Arc<dyn RagBackend>, health: HealthSignal, options: QueryOptions) -> Self {
        Self {
            backend,
            health,
            options,
            transcript: Mutex::new(ChatTranscript::new()),
            in_flight: AtomicBool::new(false),
            last_error: Mutex::new(None),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Reason of the most recent failed turn, cleared when the next one starts.
    pub fn last_error(&self) -> Option<String> {
        lock(&self.last_error).clone()
    }

    /// Snapshot of the conversation so far.
    pub fn transcript(&self) -> Vec<ChatMessage> {
        lock(&self.transcript).messages().to_vec()
    }

    pub fn transcript_len(&self) -> usize {
        lock(&self.transcript).len()
    }

    /// Ask one question.
    ///
    /// Rejected without side effects when the query is blank, another query
    /// is pending, or the service is not connected. Otherwise the user entry
    /// is appended immediately and the assistant (or error) entry once the
    /// service answers; on failure the same reason is returned as
    /// [`ClientError::Query`].
    pub async fn ask(&self, query: &str) -> Result<ChatMessage, ClientError> {
        if query.trim().is_empty() {
            return Err(ClientError::Validation("Please enter a question".to_string()));
        }
        let _guard = InFlight::acquire(&self.in_flight).ok_or(ClientError::Busy)?;
        if !self.health.is_connected() {
            return Err(ClientError::Connectivity(
                "Server connection required to chat".to_string(),
            ));
        }

        *lock(&self.last_error) = None;
        lock(&self.transcript).push_user(query);

        let request = QueryRequest {
            query: query.to_string(),
            options: self.options.clone(),
        };
        tracing::debug!(query_len = query.len(), "sending query");

        match self.backend.query(&request).await {
            Ok(answer) => {
                tracing::info!(
                    documents_found = answer.metadata.as_ref().map(|m| m.documents_found),
                    "received answer"
                );
                Ok(lock(&self.transcript).push_assistant(answer.response, answer.metadata))
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!(error = %reason, "chat error");
                lock(&self.transcript).push_error(format!("Error: {}", reason));
                *lock(&self.last_error) = Some(reason.clone());
                Err(ClientError::Query(reason))
            }
        }
    }
}

/// Locks never span an await, so a poisoned lock still holds consistent data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
