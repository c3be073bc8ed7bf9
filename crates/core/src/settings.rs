//! Per-workspace automation settings and the pure decisions derived from
//! them.
//!
//! Settings are fetched once per scheduler call and passed down as a value,
//! so the state machine stays testable without a live settings store.

use serde::{Deserialize, Serialize};

use crate::stage::Stage;
use crate::types::Timestamp;

/// Default number of execution attempts a job gets before it is failed.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;

/// Default number of generation rounds inside one execution attempt.
pub const DEFAULT_GENERATION_ROUNDS: u32 = 2;

/// Default age after which a `hybrid` workspace falls back to inline
/// execution when no external runner has claimed the job.
pub const DEFAULT_FALLBACK_AFTER_MINUTES: i64 = 30;

/// Where ready jobs execute for a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Execute inline in this process.
    Server,
    /// Leave ready jobs pending for an external Cursor runner to claim.
    Cursor,
    /// Behave as `Cursor` until a job ages past the fallback threshold,
    /// then execute inline.
    Hybrid,
}

/// How strictly generated output is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Skip validation entirely; first generation round wins.
    None,
    /// Validate with retries, but fall back to the last raw output when
    /// every round fails. Favors availability.
    Light,
    /// Validate with retries and raise a hard error when no round passes.
    /// Favors correctness.
    Schema,
}

/// Automation settings for one workspace, read once per scheduler call.
#[derive(Debug, Clone)]
pub struct WorkspaceSettings {
    pub execution_mode: ExecutionMode,
    pub validation_mode: ValidationMode,
    /// Minutes before a `Hybrid` workspace executes an unclaimed job inline.
    pub fallback_after_minutes: i64,
    /// When false the scheduler returns every dequeued job to pending.
    pub worker_enabled: bool,
    /// Minimum project stage for completion notifications. `None` notifies
    /// for every stage.
    pub notify_from_stage: Option<Stage>,
    /// Workspace-specific pipeline ordering. Empty means the default order.
    pub stage_order: Vec<Stage>,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            execution_mode: ExecutionMode::Server,
            validation_mode: ValidationMode::Light,
            fallback_after_minutes: DEFAULT_FALLBACK_AFTER_MINUTES,
            worker_enabled: true,
            notify_from_stage: None,
            stage_order: Vec::new(),
        }
    }
}

/// Outcome of deciding whether a dequeued job should run here and now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunDecision {
    /// Execute inline in this process.
    Inline,
    /// Return the job to pending without penalty, with an informational
    /// message explaining why.
    Defer(String),
}

/// Decide whether a job dequeued at `now` should execute inline.
///
/// - `worker_enabled = false` defers everything.
/// - `Server` always runs inline.
/// - `Cursor` always defers to the external runner.
/// - `Hybrid` defers until the job is strictly older than the fallback
///   threshold, then runs inline.
pub fn decide_run(
    settings: &WorkspaceSettings,
    job_created_at: Timestamp,
    now: Timestamp,
) -> RunDecision {
    if !settings.worker_enabled {
        return RunDecision::Defer("Automation worker is disabled for this workspace".to_string());
    }
    match settings.execution_mode {
        ExecutionMode::Server => RunDecision::Inline,
        ExecutionMode::Cursor => RunDecision::Defer("Awaiting Cursor runner".to_string()),
        ExecutionMode::Hybrid => {
            let age_minutes = (now - job_created_at).num_minutes();
            if age_minutes > settings.fallback_after_minutes {
                RunDecision::Inline
            } else {
                RunDecision::Defer(format!(
                    "Awaiting Cursor runner (falls back to server after {} minutes)",
                    settings.fallback_after_minutes
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn settings(mode: ExecutionMode) -> WorkspaceSettings {
        WorkspaceSettings {
            execution_mode: mode,
            ..WorkspaceSettings::default()
        }
    }

    #[test]
    fn server_mode_runs_inline() {
        let now = Utc::now();
        assert_eq!(
            decide_run(&settings(ExecutionMode::Server), now, now),
            RunDecision::Inline
        );
    }

    #[test]
    fn cursor_mode_always_defers() {
        let now = Utc::now();
        let decision = decide_run(
            &settings(ExecutionMode::Cursor),
            now - Duration::hours(6),
            now,
        );
        assert_eq!(
            decision,
            RunDecision::Defer("Awaiting Cursor runner".to_string())
        );
    }

    #[test]
    fn hybrid_defers_young_jobs() {
        let now = Utc::now();
        let decision = decide_run(
            &settings(ExecutionMode::Hybrid),
            now - Duration::minutes(10),
            now,
        );
        match decision {
            RunDecision::Defer(reason) => assert!(reason.contains("Awaiting Cursor runner")),
            RunDecision::Inline => panic!("young hybrid job should defer"),
        }
    }

    #[test]
    fn hybrid_falls_back_inline_past_threshold() {
        let now = Utc::now();
        let decision = decide_run(
            &settings(ExecutionMode::Hybrid),
            now - Duration::minutes(31),
            now,
        );
        assert_eq!(decision, RunDecision::Inline);
    }

    #[test]
    fn hybrid_at_exact_threshold_still_defers() {
        let now = Utc::now();
        let decision = decide_run(
            &settings(ExecutionMode::Hybrid),
            now - Duration::minutes(30),
            now,
        );
        assert!(matches!(decision, RunDecision::Defer(_)));
    }

    #[test]
    fn disabled_worker_defers_even_in_server_mode() {
        let mut s = settings(ExecutionMode::Server);
        s.worker_enabled = false;
        let now = Utc::now();
        match decide_run(&s, now, now) {
            RunDecision::Defer(reason) => assert!(reason.contains("disabled")),
            RunDecision::Inline => panic!("disabled worker must defer"),
        }
    }
}
