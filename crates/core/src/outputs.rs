//! Per-job-type acceptance checks on raw generated text.
//!
//! Two recurring shapes: structural markdown checks (required section
//! headings) and typed-JSON checks (tolerantly extracted, then validated
//! field by field). Pure and side-effect free; the generation-with-retry
//! loop feeds rejection reasons back as hints for the next round.

use serde_json::Value;

use crate::job_type::JobType;
use crate::json_extract::extract_json;
use crate::markdown::missing_sections;

/// Result of checking one generation round's raw output.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputVerdict {
    /// The output is acceptable. Typed-JSON checks carry the parsed value.
    Accepted(Option<Value>),
    /// The output is not acceptable; the reason names what is wrong.
    Rejected(String),
}

impl OutputVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, OutputVerdict::Accepted(_))
    }
}

/// Required markdown section titles per document-producing job type.
pub fn required_sections(job_type: JobType) -> Option<&'static [&'static str]> {
    match job_type {
        JobType::ResearchSynthesis => {
            Some(&["Key Findings", "Market Signals", "Recommendations"])
        }
        JobType::CompetitorAnalysis => Some(&["Competitors", "Comparison", "Positioning"]),
        JobType::GeneratePrd => Some(&[
            "Problem Statement",
            "Goals",
            "User Stories",
            "Requirements",
            "Success Metrics",
        ]),
        JobType::GenerateDesignBrief => Some(&[
            "Overview",
            "User Experience",
            "Visual Direction",
            "Constraints",
        ]),
        JobType::GenerateEngineeringSpec => Some(&[
            "Architecture",
            "Data Model",
            "API Design",
            "Testing Strategy",
        ]),
        JobType::GenerateGtmBrief => Some(&[
            "Target Audience",
            "Messaging",
            "Channels",
            "Launch Plan",
        ]),
        JobType::GeneratePersonas
        | JobType::ExpandPersonas
        | JobType::JuryEvaluation
        | JobType::ScoreAlignment
        | JobType::GenerateTickets
        | JobType::ValidateTickets
        | JobType::ScaffoldPrototype
        | JobType::DeployPrototype
        | JobType::CreateBranch
        | JobType::RunAgent => None,
    }
}

/// Validate one round of raw output for `job_type`.
pub fn validate_output(job_type: JobType, raw: &str) -> OutputVerdict {
    if let Some(required) = required_sections(job_type) {
        let missing = missing_sections(raw, required);
        return if missing.is_empty() {
            OutputVerdict::Accepted(None)
        } else {
            OutputVerdict::Rejected(format!(
                "missing required sections: {}",
                missing.join(", ")
            ))
        };
    }

    match job_type {
        JobType::JuryEvaluation => typed_json(raw, check_jury),
        JobType::ScoreAlignment => typed_json(raw, check_alignment),
        JobType::GenerateTickets | JobType::ValidateTickets => typed_json(raw, check_tickets),
        JobType::GeneratePersonas | JobType::ExpandPersonas => typed_json(raw, check_personas),
        // Prototype, branch, and generic agent runs carry free-form output.
        JobType::ScaffoldPrototype
        | JobType::DeployPrototype
        | JobType::CreateBranch
        | JobType::RunAgent => OutputVerdict::Accepted(None),
        // Handled by the markdown branch above.
        JobType::ResearchSynthesis
        | JobType::CompetitorAnalysis
        | JobType::GeneratePrd
        | JobType::GenerateDesignBrief
        | JobType::GenerateEngineeringSpec
        | JobType::GenerateGtmBrief => unreachable!("markdown types handled above"),
    }
}

/// Run a shape check on tolerantly extracted JSON.
fn typed_json(raw: &str, check: fn(&Value) -> Result<(), String>) -> OutputVerdict {
    match extract_json(raw) {
        None => OutputVerdict::Rejected("output contains no parseable JSON".to_string()),
        Some(value) => match check(&value) {
            Ok(()) => OutputVerdict::Accepted(Some(value)),
            Err(reason) => OutputVerdict::Rejected(reason),
        },
    }
}

fn require_number(value: &Value, field: &str) -> Result<f64, String> {
    value
        .get(field)
        .and_then(Value::as_f64)
        .ok_or_else(|| format!("field `{field}` must be a number"))
}

fn require_string<'a>(value: &'a Value, field: &str) -> Result<&'a str, String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("field `{field}` must be a string"))
}

/// Jury verdicts need a string `verdict` plus three numeric rates.
fn check_jury(value: &Value) -> Result<(), String> {
    let verdict = require_string(value, "verdict")?;
    if verdict.trim().is_empty() {
        return Err("field `verdict` must not be empty".to_string());
    }
    for field in ["approvalRate", "conditionalRate", "rejectionRate"] {
        require_number(value, field)?;
    }
    Ok(())
}

/// Alignment reports need a `score` in [0, 1] and a non-empty `summary`.
fn check_alignment(value: &Value) -> Result<(), String> {
    let score = require_number(value, "score")?;
    if !(0.0..=1.0).contains(&score) {
        return Err(format!("field `score` must be between 0.0 and 1.0, got {score}"));
    }
    let summary = require_string(value, "summary")?;
    if summary.trim().is_empty() {
        return Err("field `summary` must not be empty".to_string());
    }
    Ok(())
}

/// Ticket sets are a non-empty array where every element has a non-empty
/// `title`.
fn check_tickets(value: &Value) -> Result<(), String> {
    let tickets = value
        .as_array()
        .ok_or_else(|| "output must be a JSON array of tickets".to_string())?;
    if tickets.is_empty() {
        return Err("ticket array must not be empty".to_string());
    }
    for (i, ticket) in tickets.iter().enumerate() {
        let title = ticket
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if title.trim().is_empty() {
            return Err(format!("ticket at index {i} has no title"));
        }
    }
    Ok(())
}

/// Persona sets are a non-empty array where every element has a non-empty
/// `id`.
fn check_personas(value: &Value) -> Result<(), String> {
    let personas = value
        .as_array()
        .ok_or_else(|| "output must be a JSON array of personas".to_string())?;
    if personas.is_empty() {
        return Err("persona array must not be empty".to_string());
    }
    for (i, persona) in personas.iter().enumerate() {
        let id = persona.get("id").and_then(Value::as_str).unwrap_or_default();
        if id.trim().is_empty() {
            return Err(format!("persona at index {i} has no id"));
        }
    }
    Ok(())
}
