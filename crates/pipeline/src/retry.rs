//! Generation loop with validation feedback.
//!
//! A single generation round can come back malformed. Rather than failing
//! the whole job, the loop re-invokes the tool with a `validationHint`
//! field describing what was wrong with the previous round, up to the
//! configured round budget. What happens when the budget runs out depends
//! on the workspace validation mode: `light` keeps the last output anyway,
//! `schema` treats it as a job failure, and `none` never validates at all.

use serde_json::Value;
use tracing::{debug, warn};

use pipeworks_core::outputs::OutputVerdict;
use pipeworks_core::settings::ValidationMode;

use crate::generator::{ArtifactGenerator, GeneratorError};

/// Input field carrying the previous round's rejection reason.
const VALIDATION_HINT_FIELD: &str = "validationHint";

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    /// Every round was rejected and the workspace runs in schema mode.
    #[error("Output validation failed: {0}")]
    Validation(String),
}

/// A generation result that survived the loop.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// The raw tool output as returned by the final round.
    pub raw: String,
    /// Parsed structure, when the validator extracted one.
    pub parsed: Option<Value>,
    /// False when validation was skipped or the last round was kept despite
    /// rejection (light mode).
    pub validated: bool,
}

/// Run the tool until the validator accepts its output or `rounds` is spent.
///
/// Transport and backend errors abort immediately; only validation
/// rejections consume rounds.
pub async fn generate_validated(
    generator: &dyn ArtifactGenerator,
    tool: &str,
    input: &Value,
    mode: ValidationMode,
    rounds: u32,
    validate: impl Fn(&str) -> OutputVerdict,
) -> Result<GenerationOutcome, GenerationError> {
    if mode == ValidationMode::None {
        let raw = generator.generate(tool, input).await?;
        return Ok(GenerationOutcome {
            raw,
            parsed: None,
            validated: false,
        });
    }

    let rounds = rounds.max(1);
    let mut last_raw = String::new();
    let mut last_reason = String::new();

    for round in 1..=rounds {
        let round_input = if let (false, Value::Object(fields)) = (last_reason.is_empty(), input) {
            let mut fields = fields.clone();
            fields.insert(
                VALIDATION_HINT_FIELD.to_string(),
                Value::String(last_reason.clone()),
            );
            Value::Object(fields)
        } else {
            input.clone()
        };

        let raw = generator.generate(tool, &round_input).await?;
        match validate(&raw) {
            OutputVerdict::Accepted(parsed) => {
                debug!(tool, round, "generation accepted");
                return Ok(GenerationOutcome {
                    raw,
                    parsed,
                    validated: true,
                });
            }
            OutputVerdict::Rejected(reason) => {
                warn!(tool, round, %reason, "generation rejected");
                last_raw = raw;
                last_reason = reason;
            }
        }
    }

    match mode {
        ValidationMode::Light => Ok(GenerationOutcome {
            raw: last_raw,
            parsed: None,
            validated: false,
        }),
        ValidationMode::Schema => Err(GenerationError::Validation(last_reason)),
        ValidationMode::None => unreachable!("handled above"),
    }
}
