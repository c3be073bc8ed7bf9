//! Job execution: turn a ready job plus its context into an output value.
//!
//! Most job types invoke a backend tool through the generation loop and
//! shape the result into the job's output JSON. Two diverge: persona
//! expansion runs locally against the seed artifact, and prototype
//! deployment pauses for user input when no target environment was chosen.

use serde_json::{json, Map, Value};
use tracing::info;

use pipeworks_core::job_type::{ArtifactType, JobType};
use pipeworks_core::outputs::validate_output;
use pipeworks_core::payload::JobPayload;
use pipeworks_core::personas::expand_personas;
use pipeworks_core::settings::{WorkspaceSettings, DEFAULT_GENERATION_ROUNDS};

use pipeworks_store::Job;

use crate::generator::ArtifactGenerator;
use crate::prereq::JobContext;
use crate::retry::{generate_validated, GenerationError, GenerationOutcome};

/// Result of executing a ready job.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    /// The job produced its output and is done.
    Completed(Value),
    /// The job needs user input before it can proceed. The value describes
    /// what is being asked.
    RequiresInput(Value),
}

/// Execute a job whose prerequisites are satisfied.
pub async fn execute_job(
    job: &Job,
    ctx: &JobContext,
    settings: &WorkspaceSettings,
    generator: &dyn ArtifactGenerator,
) -> Result<ExecutionOutcome, GenerationError> {
    match &ctx.payload {
        JobPayload::PersonaExpansion { count } => expand_locally(ctx, *count as usize),
        JobPayload::Deploy { target: None } => Ok(ExecutionOutcome::RequiresInput(json!({
            "requires_input": true,
            "question": "Which environment should the prototype deploy to?",
        }))),
        _ => {
            let tool = tool_for(job, ctx);
            let input = tool_input(ctx);
            let outcome = generate_validated(
                generator,
                tool,
                &input,
                settings.validation_mode,
                DEFAULT_GENERATION_ROUNDS,
                |raw| validate_output(job.job_type, raw),
            )
            .await?;
            info!(
                job_id = job.id,
                job_type = job.job_type.as_str(),
                tool,
                validated = outcome.validated,
                "job executed"
            );
            Ok(ExecutionOutcome::Completed(shape_output(
                job.job_type,
                ctx,
                outcome,
            )))
        }
    }
}

/// Expand seed personas locally; no tool round trip.
fn expand_locally(ctx: &JobContext, count: usize) -> Result<ExecutionOutcome, GenerationError> {
    let seeds_artifact = ctx
        .artifacts
        .iter()
        .find(|a| a.artifact_type == ArtifactType::Personas)
        .ok_or_else(|| GenerationError::Validation("no persona seeds available".to_string()))?;
    let seeds: Vec<Value> = serde_json::from_str(&seeds_artifact.content).map_err(|e| {
        GenerationError::Validation(format!("persona seeds are not a JSON array: {e}"))
    })?;
    if seeds.is_empty() {
        return Err(GenerationError::Validation(
            "persona seed artifact is empty".to_string(),
        ));
    }
    let personas = expand_personas(&seeds, count);
    let count = personas.len();
    Ok(ExecutionOutcome::Completed(json!({
        "personas": personas,
        "count": count,
    })))
}

fn tool_for<'a>(job: &'a Job, ctx: &'a JobContext) -> &'a str {
    if let JobPayload::Agent { tool, .. } = &ctx.payload {
        return tool;
    }
    // Every non-agent type maps to a fixed tool.
    job.job_type.tool().unwrap_or("agent")
}

/// Build the JSON sent to the backend tool: project context, upstream
/// artifact contents keyed by artifact type, and payload-specific fields.
fn tool_input(ctx: &JobContext) -> Value {
    if let JobPayload::Agent { args, .. } = &ctx.payload {
        return args.clone();
    }

    let mut fields = Map::new();
    if let Some(project) = &ctx.project {
        fields.insert("project".to_string(), json!(project.name));
        fields.insert(
            "current_stage".to_string(),
            json!(project.current_stage.as_str()),
        );
    }
    for artifact in &ctx.artifacts {
        fields.insert(
            artifact.artifact_type.as_str().to_string(),
            json!(artifact.content),
        );
    }
    if !ctx.tickets.is_empty() {
        let titles: Vec<&str> = ctx.tickets.iter().map(|t| t.title.as_str()).collect();
        fields.insert("tickets".to_string(), json!(titles));
    }

    match &ctx.payload {
        JobPayload::Standard { instructions } => {
            if let Some(instructions) = instructions {
                fields.insert("instructions".to_string(), json!(instructions));
            }
        }
        JobPayload::Alignment {
            stage,
            instructions,
        } => {
            fields.insert("stage".to_string(), json!(stage.as_str()));
            if let Some(instructions) = instructions {
                fields.insert("instructions".to_string(), json!(instructions));
            }
        }
        JobPayload::Deploy {
            target: Some(target),
        } => {
            fields.insert("target".to_string(), json!(target));
        }
        JobPayload::Branch { branch_name } => {
            let name = branch_name
                .clone()
                .or_else(|| ctx.project.as_ref().map(|p| format!("feature/{}", slug(&p.name))))
                .unwrap_or_else(|| "feature/unnamed".to_string());
            fields.insert("branch_name".to_string(), json!(name));
        }
        // Unset deploy targets pause before reaching here; agent payloads
        // short-circuit above.
        JobPayload::Deploy { target: None }
        | JobPayload::PersonaExpansion { .. }
        | JobPayload::Agent { .. } => {}
    }

    Value::Object(fields)
}

/// Shape the generation result into the job's output JSON.
fn shape_output(job_type: JobType, ctx: &JobContext, outcome: GenerationOutcome) -> Value {
    match (job_type, outcome.parsed) {
        (JobType::GenerateTickets | JobType::ValidateTickets, Some(parsed)) => {
            let count = parsed.as_array().map(Vec::len).unwrap_or(0);
            json!({ "raw": outcome.raw, "tickets": parsed, "count": count })
        }
        (JobType::GeneratePersonas | JobType::ExpandPersonas, Some(parsed)) => {
            let count = parsed.as_array().map(Vec::len).unwrap_or(0);
            json!({ "raw": outcome.raw, "personas": parsed, "count": count })
        }
        (JobType::JuryEvaluation | JobType::ScoreAlignment, Some(parsed)) => {
            json!({ "raw": outcome.raw, "report": parsed })
        }
        (JobType::CreateBranch, _) => {
            let name = match &ctx.payload {
                JobPayload::Branch {
                    branch_name: Some(name),
                } => name.clone(),
                _ => ctx
                    .project
                    .as_ref()
                    .map(|p| format!("feature/{}", slug(&p.name)))
                    .unwrap_or_else(|| "feature/unnamed".to_string()),
            };
            json!({ "raw": outcome.raw, "branch_name": name })
        }
        (_, Some(parsed)) => json!({ "raw": outcome.raw, "result": parsed }),
        (_, None) => json!({ "raw": outcome.raw, "validated": outcome.validated }),
    }
}

/// Lowercase, alphanumeric-and-dash slug for branch names.
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_dash = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    out.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::ScriptedGenerator;
    use crate::prereq::{check_prerequisites, PrereqOutcome};
    use assert_matches::assert_matches;
    use chrono::Utc;
    use pipeworks_core::settings::ValidationMode;
    use pipeworks_core::stage::Stage;
    use pipeworks_core::status::JobStatus;
    use pipeworks_core::types::DbId;
    use pipeworks_store::MemoryStore;

    const WS: DbId = 1;

    fn job(job_type: JobType, project_id: Option<DbId>, input: Value) -> Job {
        Job {
            id: 7,
            workspace_id: WS,
            project_id,
            job_type,
            status: JobStatus::Running,
            input,
            output: None,
            error: None,
            attempts: 1,
            max_attempts: 3,
            progress: 0.0,
            created_at: Utc::now(),
            started_at: Some(Utc::now()),
            completed_at: None,
        }
    }

    async fn ready_context(store: &MemoryStore, job: &Job) -> JobContext {
        match check_prerequisites(job, store).await.unwrap() {
            PrereqOutcome::Ready(ctx) => ctx,
            other => panic!("job should be ready, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn prd_generation_completes_with_raw_output() {
        let store = MemoryStore::new();
        let project = store.insert_project(WS, "Apollo", Stage::Requirements).await;
        store
            .insert_artifact(project.id, ArtifactType::ResearchSummary, "## Key Findings")
            .await;
        let job = job(JobType::GeneratePrd, Some(project.id), json!({}));
        let ctx = ready_context(&store, &job).await;

        let gen = ScriptedGenerator::new();
        gen.push_text(
            "## Problem Statement\n## Goals\n## User Stories\n## Requirements\n## Success Metrics",
        );

        let outcome = execute_job(&job, &ctx, &WorkspaceSettings::default(), &gen)
            .await
            .unwrap();

        assert_matches!(outcome, ExecutionOutcome::Completed(output) => {
            assert!(output["raw"].as_str().unwrap().contains("Problem Statement"));
        });
        // The tool saw the upstream research summary.
        let calls = gen.calls();
        assert_eq!(calls[0].0, "prd_writer");
        assert_eq!(
            calls[0].1["research_summary"].as_str(),
            Some("## Key Findings")
        );
        assert_eq!(calls[0].1["project"].as_str(), Some("Apollo"));
    }

    #[tokio::test]
    async fn ticket_generation_reports_the_ticket_count() {
        let store = MemoryStore::new();
        let project = store.insert_project(WS, "Apollo", Stage::Tickets).await;
        store
            .insert_artifact(project.id, ArtifactType::EngineeringSpec, "## Architecture")
            .await;
        let job = job(JobType::GenerateTickets, Some(project.id), json!({}));
        let ctx = ready_context(&store, &job).await;

        let gen = ScriptedGenerator::new();
        gen.push_text(
            r#"[{"title": "Set up CI"}, {"title": "Add auth"}, {"title": "Write docs"}]"#,
        );

        let outcome = execute_job(&job, &ctx, &WorkspaceSettings::default(), &gen)
            .await
            .unwrap();

        assert_matches!(outcome, ExecutionOutcome::Completed(output) => {
            assert_eq!(output["count"].as_u64(), Some(3));
            assert_eq!(output["tickets"].as_array().unwrap().len(), 3);
        });
    }

    #[tokio::test]
    async fn deploy_without_target_pauses_for_input() {
        let store = MemoryStore::new();
        let project = store.insert_project(WS, "Apollo", Stage::Prototype).await;
        let job = job(JobType::DeployPrototype, Some(project.id), json!({}));
        let ctx = ready_context(&store, &job).await;

        let gen = ScriptedGenerator::new();
        let outcome = execute_job(&job, &ctx, &WorkspaceSettings::default(), &gen)
            .await
            .unwrap();

        assert_matches!(outcome, ExecutionOutcome::RequiresInput(ask) => {
            assert_eq!(ask["requires_input"].as_bool(), Some(true));
        });
        assert_eq!(gen.call_count(), 0);
    }

    #[tokio::test]
    async fn deploy_with_target_invokes_the_tool() {
        let store = MemoryStore::new();
        let project = store.insert_project(WS, "Apollo", Stage::Prototype).await;
        let job = job(
            JobType::DeployPrototype,
            Some(project.id),
            json!({"target": "staging"}),
        );
        let ctx = ready_context(&store, &job).await;

        let gen = ScriptedGenerator::new();
        gen.push_text("deployed to staging");

        let outcome = execute_job(&job, &ctx, &WorkspaceSettings::default(), &gen)
            .await
            .unwrap();

        assert_matches!(outcome, ExecutionOutcome::Completed(_));
        let calls = gen.calls();
        assert_eq!(calls[0].0, "prototype_deploy");
        assert_eq!(calls[0].1["target"].as_str(), Some("staging"));
    }

    #[tokio::test]
    async fn persona_expansion_runs_locally() {
        let store = MemoryStore::new();
        let project = store.insert_project(WS, "Apollo", Stage::Research).await;
        store
            .insert_artifact(
                project.id,
                ArtifactType::Personas,
                r#"[{"id": "p1", "adoption_stage": "curious", "psychographics": {"openness": 0.5}}]"#,
            )
            .await;
        let job = job(JobType::ExpandPersonas, Some(project.id), json!({"count": 12}));
        let ctx = ready_context(&store, &job).await;

        let gen = ScriptedGenerator::new();
        let outcome = execute_job(&job, &ctx, &WorkspaceSettings::default(), &gen)
            .await
            .unwrap();

        assert_matches!(outcome, ExecutionOutcome::Completed(output) => {
            assert_eq!(output["count"].as_u64(), Some(12));
            assert_eq!(output["personas"].as_array().unwrap().len(), 12);
        });
        assert_eq!(gen.call_count(), 0);
    }

    #[tokio::test]
    async fn persona_expansion_rejects_malformed_seeds() {
        let store = MemoryStore::new();
        let project = store.insert_project(WS, "Apollo", Stage::Research).await;
        store
            .insert_artifact(project.id, ArtifactType::Personas, "not json")
            .await;
        let job = job(JobType::ExpandPersonas, Some(project.id), json!({}));
        let ctx = ready_context(&store, &job).await;

        let err = execute_job(&job, &ctx, &WorkspaceSettings::default(), &ScriptedGenerator::new())
            .await
            .unwrap_err();
        assert_matches!(err, GenerationError::Validation(_));
    }

    #[tokio::test]
    async fn run_agent_passes_args_straight_through() {
        let store = MemoryStore::new();
        let job = job(
            JobType::RunAgent,
            None,
            json!({"tool": "linter", "args": {"fix": true}}),
        );
        let ctx = ready_context(&store, &job).await;

        let gen = ScriptedGenerator::new();
        gen.push_text("lint clean");

        let outcome = execute_job(&job, &ctx, &WorkspaceSettings::default(), &gen)
            .await
            .unwrap();

        assert_matches!(outcome, ExecutionOutcome::Completed(_));
        let calls = gen.calls();
        assert_eq!(calls[0].0, "linter");
        assert_eq!(calls[0].1, json!({"fix": true}));
    }

    #[tokio::test]
    async fn branch_name_is_derived_from_the_project() {
        let store = MemoryStore::new();
        let project = store.insert_project(WS, "Apollo Mk II", Stage::Prototype).await;
        let job = job(JobType::CreateBranch, Some(project.id), json!({}));
        let ctx = ready_context(&store, &job).await;

        let gen = ScriptedGenerator::new();
        gen.push_text("branch created");

        let outcome = execute_job(&job, &ctx, &WorkspaceSettings::default(), &gen)
            .await
            .unwrap();

        assert_matches!(outcome, ExecutionOutcome::Completed(output) => {
            assert_eq!(output["branch_name"].as_str(), Some("feature/apollo-mk-ii"));
        });
        let calls = gen.calls();
        assert_eq!(calls[0].1["branch_name"].as_str(), Some("feature/apollo-mk-ii"));
    }

    #[tokio::test]
    async fn schema_mode_propagates_validation_failure() {
        let store = MemoryStore::new();
        let project = store.insert_project(WS, "Apollo", Stage::Requirements).await;
        store
            .insert_artifact(project.id, ArtifactType::ResearchSummary, "## Key Findings")
            .await;
        let job = job(JobType::GeneratePrd, Some(project.id), json!({}));
        let ctx = ready_context(&store, &job).await;

        let gen = ScriptedGenerator::new();
        gen.always("no sections here");

        let settings = WorkspaceSettings {
            validation_mode: ValidationMode::Schema,
            ..WorkspaceSettings::default()
        };
        let err = execute_job(&job, &ctx, &settings, &gen).await.unwrap_err();
        assert_matches!(err, GenerationError::Validation(reason) if reason.contains("sections"));
        assert_eq!(gen.call_count() as u32, DEFAULT_GENERATION_ROUNDS);
    }
}
