//! The fire-and-forget notification seam.
//!
//! The lifecycle state machine emits at most one completion or failure
//! notification per job. Notifier implementations must never block or fail
//! job completion; delivery problems are logged and dropped.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use pipeworks_core::job_type::JobType;
use pipeworks_core::status::JobStatus;
use pipeworks_core::types::DbId;

use crate::bus::{
    EventBus, JobEvent, EVENT_JOB_COMPLETED, EVENT_JOB_FAILED, EVENT_JOB_WAITING_INPUT,
};

/// What happened to a job, for client display.
#[derive(Debug, Clone)]
pub struct JobNotification {
    pub job_id: DbId,
    pub workspace_id: DbId,
    pub project_id: Option<DbId>,
    pub job_type: JobType,
    pub status: JobStatus,
    pub error: Option<String>,
}

/// Outbound notification transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification. `project_name` is a display hint only.
    async fn notify(&self, notification: JobNotification, project_name: Option<&str>);
}

/// Publishes notifications as [`JobEvent`]s on the in-process bus.
pub struct BusNotifier {
    bus: Arc<EventBus>,
}

impl BusNotifier {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl Notifier for BusNotifier {
    async fn notify(&self, notification: JobNotification, project_name: Option<&str>) {
        let event_type = match notification.status {
            JobStatus::Completed => EVENT_JOB_COMPLETED,
            JobStatus::Failed => EVENT_JOB_FAILED,
            JobStatus::WaitingInput => EVENT_JOB_WAITING_INPUT,
            JobStatus::Pending | JobStatus::Running | JobStatus::Cancelled => {
                // Intermediate transitions are never notified.
                tracing::debug!(
                    job_id = notification.job_id,
                    status = notification.status.as_str(),
                    "Suppressing notification for intermediate status",
                );
                return;
            }
        };

        self.bus.publish(
            JobEvent::new(event_type, notification.job_id, notification.workspace_id)
                .with_project(notification.project_id)
                .with_payload(json!({
                    "job_type": notification.job_type.as_str(),
                    "error": notification.error,
                    "project_name": project_name,
                })),
        );
    }
}

/// Swallows every notification. For tests and disabled workspaces.
#[derive(Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, _notification: JobNotification, _project_name: Option<&str>) {}
}
