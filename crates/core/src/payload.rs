//! Typed views over the opaque job input map.
//!
//! Job rows persist `input` as free-form JSON. At execution time the input
//! is parsed into a typed payload for the job's kind; missing required
//! fields are hard errors. Fields not modeled here ride along untouched in
//! the raw value (the structured-map escape hatch).

use serde_json::Value;

use crate::error::CoreError;
use crate::job_type::JobType;
use crate::stage::Stage;

/// Default persona count for expansion when the input does not specify one.
pub const DEFAULT_PERSONA_COUNT: u32 = 100;

/// Typed payload for one job, parsed from the job's opaque input.
#[derive(Debug, Clone, PartialEq)]
pub enum JobPayload {
    /// Document- and report-producing types: free instructions only.
    Standard { instructions: Option<String> },
    /// Stage alignment scoring: which stage to score against.
    Alignment {
        stage: Stage,
        instructions: Option<String>,
    },
    /// Persona expansion: how many personas the jury needs.
    PersonaExpansion { count: u32 },
    /// Prototype deployment: the target environment, when already chosen.
    Deploy { target: Option<String> },
    /// Branch creation: explicit branch name, or derived from the project.
    Branch { branch_name: Option<String> },
    /// Generic agent execution: tool name plus passthrough arguments.
    Agent { tool: String, args: Value },
}

impl JobPayload {
    /// Parse the opaque `input` for `job_type`. Errors are hard failures.
    pub fn parse(job_type: JobType, input: &Value) -> Result<Self, CoreError> {
        match job_type {
            JobType::ScoreAlignment => {
                let raw_stage = str_field(input, "stage").ok_or_else(|| {
                    CoreError::Validation("score_alignment requires a `stage` field".to_string())
                })?;
                let stage = Stage::parse(raw_stage)
                    .ok_or_else(|| CoreError::Validation(format!("unknown stage `{raw_stage}`")))?;
                Ok(JobPayload::Alignment {
                    stage,
                    instructions: str_field(input, "instructions").map(str::to_string),
                })
            }
            JobType::ExpandPersonas => {
                let count = input
                    .get("count")
                    .and_then(Value::as_u64)
                    .map(|c| c as u32)
                    .unwrap_or(DEFAULT_PERSONA_COUNT);
                if count == 0 {
                    return Err(CoreError::Validation(
                        "persona count must be positive".to_string(),
                    ));
                }
                Ok(JobPayload::PersonaExpansion { count })
            }
            JobType::DeployPrototype => Ok(JobPayload::Deploy {
                target: str_field(input, "target")
                    .filter(|t| !t.trim().is_empty())
                    .map(str::to_string),
            }),
            JobType::CreateBranch => Ok(JobPayload::Branch {
                branch_name: str_field(input, "branch_name")
                    .filter(|n| !n.trim().is_empty())
                    .map(str::to_string),
            }),
            JobType::RunAgent => {
                let tool = str_field(input, "tool")
                    .filter(|t| !t.trim().is_empty())
                    .ok_or_else(|| {
                        CoreError::Validation(
                            "run_agent requires a non-empty `tool` field".to_string(),
                        )
                    })?;
                Ok(JobPayload::Agent {
                    tool: tool.to_string(),
                    args: input.get("args").cloned().unwrap_or(Value::Null),
                })
            }
            JobType::ResearchSynthesis
            | JobType::CompetitorAnalysis
            | JobType::GeneratePersonas
            | JobType::GeneratePrd
            | JobType::GenerateDesignBrief
            | JobType::GenerateEngineeringSpec
            | JobType::GenerateGtmBrief
            | JobType::JuryEvaluation
            | JobType::GenerateTickets
            | JobType::ValidateTickets
            | JobType::ScaffoldPrototype => Ok(JobPayload::Standard {
                instructions: str_field(input, "instructions").map(str::to_string),
            }),
        }
    }
}

fn str_field<'a>(input: &'a Value, field: &str) -> Option<&'a str> {
    input.get(field).and_then(Value::as_str)
}
