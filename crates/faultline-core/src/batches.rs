//! Event batch queue messages and transport traits
//!
//! The ingestion front door decodes submitted payloads into `RawEvent`s and
//! enqueues them as `EventBatch` messages. The pipeline consumes batches
//! through the `BatchQueue`/`BatchReceiver` traits so it never depends on a
//! concrete transport.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::UtcDateTime;

/// A single decoded event as produced by the front door. Enrichment and
/// classification happen later, in the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    /// Event kind, e.g. "error", "log", "session".
    pub event_type: String,
    pub source: Option<String>,
    pub message: Option<String>,
    pub date: UtcDateTime,
    /// Client-supplied correlation id, used to attach user descriptions.
    pub reference_id: Option<String>,
    pub session_id: Option<String>,
    /// Structured payload (error info, request info, user info).
    pub data: Option<serde_json::Value>,
}

/// Queue message carrying one batch of raw events for a single project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBatch {
    pub organization_id: String,
    pub project_id: String,
    pub submission_date: UtcDateTime,
    /// Client/format version; enrichment plugins use it to pick parsing rules.
    pub format_version: i32,
    pub events: Vec<RawEvent>,
}

impl fmt::Display for EventBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EventBatch(project: {}, events: {}, version: {})",
            self.project_id,
            self.events.len(),
            self.format_version
        )
    }
}

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Failed to send batch: {0}")]
    SendError(String),

    #[error("Failed to receive batch: {0}")]
    ReceiveError(String),

    #[error("Queue channel closed")]
    ChannelClosed,
}

/// Receiving half of the batch queue.
#[async_trait]
pub trait BatchReceiver: Send {
    async fn recv(&mut self) -> Result<EventBatch, QueueError>;
}

/// Sending half of the batch queue; implementations fan batches out to every
/// subscribed worker.
#[async_trait]
pub trait BatchQueue: Send + Sync {
    async fn send(&self, batch: EventBatch) -> Result<(), QueueError>;

    fn subscribe(&self) -> Box<dyn BatchReceiver>;
}
