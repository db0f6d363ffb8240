//! Connection supervision.
//!
//! [`ConnectionMonitor`] is the single writer of the health signal; every
//! gated component holds a [`HealthSignal`] reader. The signal is a
//! `tokio::sync::watch` channel owned by the session, so there is no
//! process-wide global.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::backend::RagBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// No probe has resolved yet.
    Unknown,
    Connected,
    Disconnected,
}

impl HealthStatus {
    pub fn is_connected(self) -> bool {
        self == HealthStatus::Connected
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HealthStatus::Unknown => "Unknown",
            HealthStatus::Connected => "Connected",
            HealthStatus::Disconnected => "Disconnected",
        };
        f.write_str(label)
    }
}

/// Read-only view of the health signal.
#[derive(Debug, Clone)]
pub struct HealthSignal {
    rx: watch::Receiver<HealthStatus>,
}

impl HealthSignal {
    pub fn current(&self) -> HealthStatus {
        *self.rx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.current().is_connected()
    }

    /// Wait for the next status change. Returns `None` once the monitor is gone.
    pub async fn changed(&mut self) -> Option<HealthStatus> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}

pub struct ConnectionMonitor {
    backend: Arc<dyn RagBackend>,
    tx: watch::Sender<HealthStatus>,
    timeout: Duration,
}

impl ConnectionMonitor {
    pub fn new(backend: Arc<dyn RagBackend>, timeout: Duration) -> Self {
        let (tx, _rx) = watch::channel(HealthStatus::Unknown);
        Self {
            backend,
            tx,
            timeout,
        }
    }

    pub fn signal(&self) -> HealthSignal {
        HealthSignal {
            rx: self.tx.subscribe(),
        }
    }

    pub fn status(&self) -> HealthStatus {
        *self.tx.borrow()
    }

    /// Check reachability of the service and publish the result.
    ///
    /// Never fails: network errors, non-success statuses and timeouts all
    /// resolve to [`HealthStatus::Disconnected`]. Safe to call repeatedly and
    /// concurrently with other in-flight operations.
    pub async fn probe(&self) -> HealthStatus {
        let status = match tokio::time::timeout(self.timeout, self.backend.health()).await {
            Ok(Ok(())) => HealthStatus::Connected,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "RAG API connection failed");
                HealthStatus::Disconnected
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "RAG API health check timed out");
                HealthStatus::Disconnected
            }
        };

        let previous = self.tx.send_replace(status);
        if previous != status {
            tracing::info!(from = %previous, to = %status, "connection status changed");
        }
        status
    }
}
