//! Persona seed expansion for jury evaluation.
//!
//! A jury often needs more personas than the committed seed set provides.
//! Expansion creates light variations of seeds: psychographic values are
//! nudged by a bounded variance and clamped to [0, 1], and occasionally the
//! AI adoption stage shifts to an adjacent stage.

use rand::Rng;
use serde_json::Value;

/// Maximum absolute variance applied to a psychographic value.
pub const PSYCHOGRAPHIC_VARIANCE: f64 = 0.15;

/// Probability that an expanded persona shifts adoption stage.
pub const STAGE_SHIFT_PROBABILITY: f64 = 0.1;

/// Psychographic fields subject to variance during expansion.
const VARIED_FIELDS: &[&str] = &[
    "trust_in_ai",
    "tool_fatigue",
    "patience_for_learning",
    "complexity_tolerance",
    "migration_sensitivity",
];

/// Adoption stages in order; shifts move one step toward a neighbor.
const ADOPTION_STAGES: &[&str] = &["skeptic", "curious", "early-adopter", "power-user"];

/// Expand `seeds` into exactly `target` personas.
///
/// Seeds are used as-is first; the remainder are variations cycling through
/// the seed list. Returns an empty vector when there are no seeds to vary.
pub fn expand_personas(seeds: &[Value], target: usize) -> Vec<Value> {
    if seeds.is_empty() {
        return Vec::new();
    }
    let mut personas: Vec<Value> = seeds.iter().take(target).cloned().collect();
    let mut index = 0usize;
    while personas.len() < target {
        let seed = &seeds[index % seeds.len()];
        personas.push(expand_one(seed, index));
        index += 1;
    }
    personas
}

/// Create one light variation of a seed persona.
fn expand_one(seed: &Value, index: usize) -> Value {
    let mut persona = seed.clone();
    let mut rng = rand::rng();

    let seed_id = seed.get("id").and_then(Value::as_str).unwrap_or("seed");
    if let Some(obj) = persona.as_object_mut() {
        obj.insert(
            "id".to_string(),
            Value::String(format!("expanded_{seed_id}_{index}")),
        );
    }

    let Some(psych) = persona
        .get_mut("psychographics")
        .and_then(Value::as_object_mut)
    else {
        return persona;
    };

    for field in VARIED_FIELDS {
        if let Some(current) = psych.get(*field).and_then(Value::as_f64) {
            let variance = rng.random_range(-PSYCHOGRAPHIC_VARIANCE..=PSYCHOGRAPHIC_VARIANCE);
            let varied = ((current + variance).clamp(0.0, 1.0) * 100.0).round() / 100.0;
            if let Some(number) = serde_json::Number::from_f64(varied) {
                psych.insert(field.to_string(), Value::Number(number));
            }
        }
    }

    if rng.random_bool(STAGE_SHIFT_PROBABILITY) {
        let current = psych
            .get("ai_adoption_stage")
            .and_then(Value::as_str)
            .unwrap_or("curious");
        if let Some(pos) = ADOPTION_STAGES.iter().position(|s| *s == current) {
            let shifted = if pos == 0 {
                ADOPTION_STAGES[1]
            } else if pos == ADOPTION_STAGES.len() - 1 {
                ADOPTION_STAGES[pos - 1]
            } else if rng.random_bool(0.5) {
                ADOPTION_STAGES[pos - 1]
            } else {
                ADOPTION_STAGES[pos + 1]
            };
            psych.insert(
                "ai_adoption_stage".to_string(),
                Value::String(shifted.to_string()),
            );
        }
    }

    persona
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    fn seed(id: &str, trust: f64) -> Value {
        json!({
            "id": id,
            "name": "Seed",
            "psychographics": {
                "trust_in_ai": trust,
                "tool_fatigue": 0.5,
                "ai_adoption_stage": "curious"
            }
        })
    }

    #[test]
    fn no_seeds_yields_nothing() {
        assert!(expand_personas(&[], 10).is_empty());
    }

    #[test]
    fn seeds_are_used_before_expanding() {
        let seeds = vec![seed("a", 0.5), seed("b", 0.5)];
        let personas = expand_personas(&seeds, 2);
        assert_eq!(personas, seeds);
    }

    #[test]
    fn expansion_reaches_the_target_count() {
        let seeds = vec![seed("a", 0.5)];
        assert_eq!(expand_personas(&seeds, 7).len(), 7);
    }

    #[test]
    fn expanded_ids_are_unique() {
        let seeds = vec![seed("a", 0.5), seed("b", 0.5)];
        let personas = expand_personas(&seeds, 20);
        let ids: HashSet<&str> = personas
            .iter()
            .map(|p| p.get("id").and_then(Value::as_str).unwrap())
            .collect();
        assert_eq!(ids.len(), 20);
    }

    #[test]
    fn psychographics_stay_clamped() {
        // Seeds at the extremes: variance must never push values outside [0,1].
        let seeds = vec![seed("hi", 1.0), seed("lo", 0.0)];
        let personas = expand_personas(&seeds, 50);
        for persona in &personas {
            let trust = persona["psychographics"]["trust_in_ai"].as_f64().unwrap();
            assert!((0.0..=1.0).contains(&trust), "trust {trust} out of range");
        }
    }

    #[test]
    fn adoption_stage_stays_in_known_set() {
        let seeds = vec![seed("a", 0.5)];
        let personas = expand_personas(&seeds, 100);
        for persona in &personas {
            let stage = persona["psychographics"]["ai_adoption_stage"]
                .as_str()
                .unwrap();
            assert!(ADOPTION_STAGES.contains(&stage), "unknown stage {stage}");
        }
    }
}
