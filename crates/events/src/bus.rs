//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the central publish/subscribe hub for [`JobEvent`]s.
//! It is designed to be shared via `Arc<EventBus>` across the application;
//! the client notification transport (polling or push) subscribes here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use pipeworks_core::types::DbId;

// ---------------------------------------------------------------------------
// JobEvent
// ---------------------------------------------------------------------------

/// Job completed successfully.
pub const EVENT_JOB_COMPLETED: &str = "job_completed";

/// Job failed after exhausting its attempts.
pub const EVENT_JOB_FAILED: &str = "job_failed";

/// Job is parked awaiting an external decision.
pub const EVENT_JOB_WAITING_INPUT: &str = "job_waiting_input";

/// A job lifecycle event published to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    /// One of the `EVENT_JOB_*` constants.
    pub event_type: String,

    pub job_id: DbId,
    pub workspace_id: DbId,
    pub project_id: Option<DbId>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl JobEvent {
    /// Create a new event with an empty payload.
    pub fn new(event_type: impl Into<String>, job_id: DbId, workspace_id: DbId) -> Self {
        Self {
            event_type: event_type.into(),
            job_id,
            workspace_id,
            project_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Attach the owning project.
    pub fn with_project(mut self, project_id: Option<DbId>) -> Self {
        self.project_id = project_id;
        self
    }

    /// Set the JSON payload for the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`JobEvent`].
pub struct EventBus {
    sender: broadcast::Sender<JobEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: JobEvent) {
        // Ignore the SendError: it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
