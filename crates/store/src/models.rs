//! Persisted entities exchanged across the store seams.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use pipeworks_core::job_type::{ArtifactType, JobType};
use pipeworks_core::settings::DEFAULT_MAX_ATTEMPTS;
use pipeworks_core::stage::Stage;
use pipeworks_core::status::{JobStatus, RunStatus};
use pipeworks_core::types::{DbId, Timestamp};

/// A row from the job queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: DbId,
    pub workspace_id: DbId,
    pub project_id: Option<DbId>,
    pub job_type: JobType,
    pub status: JobStatus,
    /// Opaque structured input; parsed into a typed payload at execution.
    pub input: Value,
    /// Structured output, set on completion or waiting-input.
    pub output: Option<Value>,
    /// Last error message, set on failure, cleared on retry.
    pub error: Option<String>,
    pub attempts: i32,
    pub max_attempts: i32,
    /// Execution progress in `0.0..=1.0`.
    pub progress: f64,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl Job {
    /// Whether the scheduler may still dequeue this job.
    pub fn is_dequeueable(&self) -> bool {
        self.status == JobStatus::Pending && self.attempts < self.max_attempts
    }
}

/// Input for submitting a new job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub workspace_id: DbId,
    pub project_id: Option<DbId>,
    pub job_type: JobType,
    pub input: Value,
    pub max_attempts: Option<i32>,
}

impl NewJob {
    pub fn new(workspace_id: DbId, project_id: Option<DbId>, job_type: JobType) -> Self {
        Self {
            workspace_id,
            project_id,
            job_type,
            input: Value::Object(Default::default()),
            max_attempts: None,
        }
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = input;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub(crate) fn max_attempts_or_default(&self) -> i32 {
        self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS)
    }
}

/// One row per execution attempt. Audit only, never consulted for control
/// flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRun {
    pub id: DbId,
    pub job_id: DbId,
    pub attempt: i32,
    pub status: RunStatus,
    pub error_detail: Option<String>,
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

/// A project owning pipeline artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: DbId,
    pub workspace_id: DbId,
    pub name: String,
    /// The furthest pipeline stage the project has reached.
    pub current_stage: Stage,
}

/// A generated document or report stored against a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: DbId,
    pub project_id: DbId,
    pub artifact_type: ArtifactType,
    pub content: String,
    pub created_at: Timestamp,
}

/// An engineering ticket attached to a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: DbId,
    pub project_id: DbId,
    pub title: String,
    pub description: Option<String>,
}

/// Job counts by status for one workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub waiting_input: usize,
    pub cancelled: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: JobStatus) {
        match status {
            JobStatus::Pending => self.pending += 1,
            JobStatus::Running => self.running += 1,
            JobStatus::Completed => self.completed += 1,
            JobStatus::Failed => self.failed += 1,
            JobStatus::WaitingInput => self.waiting_input += 1,
            JobStatus::Cancelled => self.cancelled += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.running + self.completed + self.failed + self.waiting_input
            + self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_job_defaults_max_attempts() {
        let new = NewJob::new(1, Some(2), JobType::GeneratePrd);
        assert_eq!(new.max_attempts_or_default(), DEFAULT_MAX_ATTEMPTS);
        assert_eq!(
            NewJob::new(1, None, JobType::RunAgent)
                .with_max_attempts(5)
                .max_attempts_or_default(),
            5
        );
    }

    #[test]
    fn dequeueable_requires_pending_and_budget() {
        let mut job = Job {
            id: 1,
            workspace_id: 1,
            project_id: None,
            job_type: JobType::GeneratePrd,
            status: JobStatus::Pending,
            input: json!({}),
            output: None,
            error: None,
            attempts: 0,
            max_attempts: 3,
            progress: 0.0,
            created_at: chrono::Utc::now(),
            started_at: None,
            completed_at: None,
        };
        assert!(job.is_dequeueable());

        job.attempts = 3;
        assert!(!job.is_dequeueable());

        job.attempts = 0;
        job.status = JobStatus::Failed;
        assert!(!job.is_dequeueable());
    }

    #[test]
    fn status_counts_accumulate() {
        let mut counts = StatusCounts::default();
        counts.record(JobStatus::Pending);
        counts.record(JobStatus::Pending);
        counts.record(JobStatus::Failed);
        assert_eq!(counts.pending, 2);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.total(), 3);
    }
}
