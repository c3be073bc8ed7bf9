//! Job execution status and per-attempt run status.

use serde::{Deserialize, Serialize};

/// Execution status of a background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    WaitingInput,
    Cancelled,
}

impl JobStatus {
    /// String representation for persistence and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::WaitingInput => "waiting_input",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Parse from a stored string. Returns `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "running" => Some(JobStatus::Running),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            "waiting_input" => Some(JobStatus::WaitingInput),
            "cancelled" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }

    /// A terminal status never changes except via an explicit retry.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Whether cancellation is still honored in this status.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }
}

/// Status of a single execution attempt (audit only, never control flow).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    WaitingInput,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::WaitingInput => "waiting_input",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::WaitingInput,
            JobStatus::Cancelled,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn unknown_status_string_rejected() {
        assert_eq!(JobStatus::parse("retrying"), None);
        assert_eq!(JobStatus::parse(""), None);
    }

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        // Waiting for input is resumable, not terminal.
        assert!(!JobStatus::WaitingInput.is_terminal());
    }

    #[test]
    fn cancellable_only_while_pending_or_running() {
        assert!(JobStatus::Pending.is_cancellable());
        assert!(JobStatus::Running.is_cancellable());
        assert!(!JobStatus::WaitingInput.is_cancellable());
        assert!(!JobStatus::Completed.is_cancellable());
    }
}
