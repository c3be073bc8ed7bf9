//! Per-job-type prerequisite validation.
//!
//! Stages form a dependency DAG: a design brief cannot be written before the
//! PRD exists, tickets need an engineering spec, and so on. A missing
//! upstream artifact is a *soft* wait (several sibling jobs may legitimately
//! wait at once and must not burn retry budget), while a missing project or
//! malformed input is a hard error. Read-only; no side effects.

use pipeworks_core::job_type::{ArtifactType, JobType};
use pipeworks_core::payload::JobPayload;
use pipeworks_core::stage::Stage;

use pipeworks_store::{Artifact, Job, Project, ProjectReader, StoreError, Ticket};

/// Everything execution needs once prerequisites are satisfied.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub payload: JobPayload,
    /// Absent only for `run_agent`.
    pub project: Option<Project>,
    /// Upstream artifacts, required ones first.
    pub artifacts: Vec<Artifact>,
    /// Existing tickets, populated for ticket validation.
    pub tickets: Vec<Ticket>,
}

/// Outcome of the prerequisite check.
#[derive(Debug, Clone)]
pub enum PrereqOutcome {
    /// All prerequisites satisfied; execute now.
    Ready(JobContext),
    /// An upstream dependency has not been produced yet. Defer without
    /// penalty; the reason names what is being waited on.
    SoftWait(String),
    /// The job can never run as submitted.
    HardError(String),
}

/// The artifact a given stage is scored against for alignment.
fn alignment_source(stage: Stage) -> Option<ArtifactType> {
    match stage {
        Stage::Research => Some(ArtifactType::ResearchSummary),
        Stage::Requirements => Some(ArtifactType::Prd),
        Stage::Design => Some(ArtifactType::DesignBrief),
        Stage::Engineering => Some(ArtifactType::EngineeringSpec),
        Stage::GoToMarket => Some(ArtifactType::GtmBrief),
        Stage::Evaluation | Stage::Tickets | Stage::Prototype => None,
    }
}

/// Artifacts that must exist before a job type may run.
fn required_artifacts(job_type: JobType) -> &'static [ArtifactType] {
    match job_type {
        JobType::ExpandPersonas => &[ArtifactType::Personas],
        JobType::GeneratePrd => &[ArtifactType::ResearchSummary],
        JobType::GenerateDesignBrief | JobType::GenerateGtmBrief | JobType::JuryEvaluation => {
            &[ArtifactType::Prd]
        }
        JobType::GenerateEngineeringSpec => &[ArtifactType::DesignBrief],
        JobType::GenerateTickets | JobType::ScaffoldPrototype => &[ArtifactType::EngineeringSpec],
        JobType::ResearchSynthesis
        | JobType::CompetitorAnalysis
        | JobType::GeneratePersonas
        | JobType::ScoreAlignment
        | JobType::ValidateTickets
        | JobType::DeployPrototype
        | JobType::CreateBranch
        | JobType::RunAgent => &[],
    }
}

/// Validate a job's prerequisites against the project store.
pub async fn check_prerequisites(
    job: &Job,
    reader: &dyn ProjectReader,
) -> Result<PrereqOutcome, StoreError> {
    let payload = match JobPayload::parse(job.job_type, &job.input) {
        Ok(payload) => payload,
        Err(err) => return Ok(PrereqOutcome::HardError(err.to_string())),
    };

    // Generic agent runs are not tied to a project.
    if job.job_type == JobType::RunAgent {
        return Ok(PrereqOutcome::Ready(JobContext {
            payload,
            project: None,
            artifacts: Vec::new(),
            tickets: Vec::new(),
        }));
    }

    let Some(project_id) = job.project_id else {
        return Ok(PrereqOutcome::HardError(format!(
            "{} job has no project",
            job.job_type.as_str()
        )));
    };
    let Some(project) = reader.get_project(project_id).await? else {
        return Ok(PrereqOutcome::HardError(format!(
            "Project {project_id} not found"
        )));
    };

    let mut artifacts = Vec::new();
    for artifact_type in required_artifacts(job.job_type) {
        match reader.get_artifact(project_id, *artifact_type).await? {
            Some(artifact) => artifacts.push(artifact),
            None => {
                return Ok(PrereqOutcome::SoftWait(format!(
                    "Waiting for {} to be generated",
                    artifact_type.display_name()
                )))
            }
        }
    }

    // Type-specific requirements beyond the plain artifact list.
    match &payload {
        JobPayload::Alignment { stage, .. } => {
            let Some(source) = alignment_source(*stage) else {
                return Ok(PrereqOutcome::HardError(format!(
                    "stage {} has no scoreable artifact",
                    stage.as_str()
                )));
            };
            match reader.get_artifact(project_id, source).await? {
                Some(artifact) => artifacts.push(artifact),
                None => {
                    return Ok(PrereqOutcome::SoftWait(format!(
                        "Waiting for {} to be generated",
                        source.display_name()
                    )))
                }
            }
        }
        JobPayload::Standard { .. }
        | JobPayload::PersonaExpansion { .. }
        | JobPayload::Deploy { .. }
        | JobPayload::Branch { .. }
        | JobPayload::Agent { .. } => {}
    }

    let mut tickets = Vec::new();
    if job.job_type == JobType::ValidateTickets {
        tickets = reader.list_tickets(project_id).await?;
        if tickets.is_empty() {
            return Ok(PrereqOutcome::SoftWait(
                "Waiting for tickets to be generated".to_string(),
            ));
        }
    }

    // Jury evaluation uses personas when the project has them, but does not
    // block on them.
    if job.job_type == JobType::JuryEvaluation {
        if let Some(personas) = reader.get_artifact(project_id, ArtifactType::Personas).await? {
            artifacts.push(personas);
        }
    }

    Ok(PrereqOutcome::Ready(JobContext {
        payload,
        project: Some(project),
        artifacts,
        tickets,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use pipeworks_core::status::JobStatus;
    use pipeworks_core::types::DbId;
    use pipeworks_store::MemoryStore;
    use serde_json::{json, Value};

    const WS: DbId = 1;

    fn empty_input() -> Value {
        json!({})
    }

    fn job(job_type: JobType, project_id: Option<DbId>, input: Value) -> Job {
        Job {
            id: 1,
            workspace_id: WS,
            project_id,
            job_type,
            status: JobStatus::Pending,
            input,
            output: None,
            error: None,
            attempts: 0,
            max_attempts: 3,
            progress: 0.0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn missing_project_is_a_hard_error() {
        let store = MemoryStore::new();
        let outcome =
            check_prerequisites(&job(JobType::GeneratePrd, None, empty_input()), &store)
                .await
                .unwrap();
        assert_matches!(outcome, PrereqOutcome::HardError(reason) if reason.contains("no project"));
    }

    #[tokio::test]
    async fn unknown_project_is_a_hard_error() {
        let store = MemoryStore::new();
        let outcome =
            check_prerequisites(&job(JobType::GeneratePrd, Some(999), empty_input()), &store)
                .await
                .unwrap();
        assert_matches!(outcome, PrereqOutcome::HardError(reason) if reason.contains("999"));
    }

    #[tokio::test]
    async fn design_brief_soft_waits_on_missing_prd() {
        let store = MemoryStore::new();
        let project = store.insert_project(WS, "Apollo", Stage::Design).await;

        let outcome = check_prerequisites(
            &job(JobType::GenerateDesignBrief, Some(project.id), empty_input()),
            &store,
        )
        .await
        .unwrap();

        assert_matches!(outcome, PrereqOutcome::SoftWait(reason) if reason.contains("PRD"));
    }

    #[tokio::test]
    async fn design_brief_ready_once_prd_exists() {
        let store = MemoryStore::new();
        let project = store.insert_project(WS, "Apollo", Stage::Design).await;
        store
            .insert_artifact(project.id, ArtifactType::Prd, "## Goals")
            .await;

        let outcome = check_prerequisites(
            &job(JobType::GenerateDesignBrief, Some(project.id), empty_input()),
            &store,
        )
        .await
        .unwrap();

        assert_matches!(outcome, PrereqOutcome::Ready(ctx) => {
            assert_eq!(ctx.artifacts.len(), 1);
            assert_eq!(ctx.artifacts[0].artifact_type, ArtifactType::Prd);
        });
    }

    #[tokio::test]
    async fn research_synthesis_is_ready_with_only_a_project() {
        let store = MemoryStore::new();
        let project = store.insert_project(WS, "Apollo", Stage::Research).await;

        let outcome = check_prerequisites(
            &job(JobType::ResearchSynthesis, Some(project.id), empty_input()),
            &store,
        )
        .await
        .unwrap();

        assert_matches!(outcome, PrereqOutcome::Ready(_));
    }

    #[tokio::test]
    async fn run_agent_needs_no_project_but_needs_a_tool() {
        let store = MemoryStore::new();

        let ready = check_prerequisites(
            &job(JobType::RunAgent, None, json!({"tool": "linter"})),
            &store,
        )
        .await
        .unwrap();
        assert_matches!(ready, PrereqOutcome::Ready(ctx) => assert!(ctx.project.is_none()));

        let broken = check_prerequisites(&job(JobType::RunAgent, None, empty_input()), &store)
            .await
            .unwrap();
        assert_matches!(broken, PrereqOutcome::HardError(reason) if reason.contains("tool"));
    }

    #[tokio::test]
    async fn alignment_waits_on_the_scored_stage_artifact() {
        let store = MemoryStore::new();
        let project = store.insert_project(WS, "Apollo", Stage::Design).await;

        let waiting = check_prerequisites(
            &job(
                JobType::ScoreAlignment,
                Some(project.id),
                json!({"stage": "design"}),
            ),
            &store,
        )
        .await
        .unwrap();
        assert_matches!(waiting, PrereqOutcome::SoftWait(reason) if reason.contains("design brief"));

        store
            .insert_artifact(project.id, ArtifactType::DesignBrief, "## Overview")
            .await;
        let ready = check_prerequisites(
            &job(
                JobType::ScoreAlignment,
                Some(project.id),
                json!({"stage": "design"}),
            ),
            &store,
        )
        .await
        .unwrap();
        assert_matches!(ready, PrereqOutcome::Ready(_));
    }

    #[tokio::test]
    async fn alignment_against_unscoreable_stage_is_hard() {
        let store = MemoryStore::new();
        let project = store.insert_project(WS, "Apollo", Stage::Tickets).await;

        let outcome = check_prerequisites(
            &job(
                JobType::ScoreAlignment,
                Some(project.id),
                json!({"stage": "tickets"}),
            ),
            &store,
        )
        .await
        .unwrap();
        assert_matches!(outcome, PrereqOutcome::HardError(reason) if reason.contains("tickets"));
    }

    #[tokio::test]
    async fn ticket_validation_waits_for_tickets() {
        let store = MemoryStore::new();
        let project = store.insert_project(WS, "Apollo", Stage::Tickets).await;

        let waiting = check_prerequisites(
            &job(JobType::ValidateTickets, Some(project.id), empty_input()),
            &store,
        )
        .await
        .unwrap();
        assert_matches!(waiting, PrereqOutcome::SoftWait(reason) if reason.contains("tickets"));

        store.insert_ticket(project.id, "Set up CI").await;
        let ready = check_prerequisites(
            &job(JobType::ValidateTickets, Some(project.id), empty_input()),
            &store,
        )
        .await
        .unwrap();
        assert_matches!(ready, PrereqOutcome::Ready(ctx) => assert_eq!(ctx.tickets.len(), 1));
    }

    #[tokio::test]
    async fn jury_attaches_personas_when_present() {
        let store = MemoryStore::new();
        let project = store.insert_project(WS, "Apollo", Stage::Evaluation).await;
        store
            .insert_artifact(project.id, ArtifactType::Prd, "## Goals")
            .await;
        store
            .insert_artifact(project.id, ArtifactType::Personas, r#"[{"id": "p1"}]"#)
            .await;

        let outcome = check_prerequisites(
            &job(JobType::JuryEvaluation, Some(project.id), empty_input()),
            &store,
        )
        .await
        .unwrap();

        assert_matches!(outcome, PrereqOutcome::Ready(ctx) => {
            let types: Vec<_> = ctx.artifacts.iter().map(|a| a.artifact_type).collect();
            assert!(types.contains(&ArtifactType::Prd));
            assert!(types.contains(&ArtifactType::Personas));
        });
    }

    #[tokio::test]
    async fn malformed_input_is_a_hard_error() {
        let store = MemoryStore::new();
        let project = store.insert_project(WS, "Apollo", Stage::Evaluation).await;

        let outcome = check_prerequisites(
            &job(JobType::ScoreAlignment, Some(project.id), empty_input()),
            &store,
        )
        .await
        .unwrap();
        assert_matches!(outcome, PrereqOutcome::HardError(reason) if reason.contains("stage"));
    }
}
