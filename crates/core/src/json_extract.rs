//! Tolerant JSON extraction from raw generated text.
//!
//! Generation backends wrap JSON in prose or markdown fences more often than
//! not. Extraction tries, in order:
//!
//! 1. each fenced code block (```json or bare ```),
//! 2. the first balanced `{…}` or `[…]` span in the text.

use serde_json::Value;

/// Extract the first parseable JSON value from `raw`.
pub fn extract_json(raw: &str) -> Option<Value> {
    for block in fenced_blocks(raw) {
        if let Ok(value) = serde_json::from_str::<Value>(block.trim()) {
            return Some(value);
        }
        // A fenced block may itself carry surrounding prose.
        if let Some(value) = balanced_span(block).and_then(|s| serde_json::from_str(s).ok()) {
            return Some(value);
        }
    }
    balanced_span(raw).and_then(|span| serde_json::from_str(span).ok())
}

/// The contents of every fenced code block in `raw`, language tag stripped.
fn fenced_blocks(raw: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = raw;
    while let Some(start) = rest.find("```") {
        let after_fence = &rest[start + 3..];
        // Skip the info string (e.g. "json") up to the first newline.
        let Some(newline) = after_fence.find('\n') else { break };
        let body = &after_fence[newline + 1..];
        let Some(end) = body.find("```") else { break };
        blocks.push(&body[..end]);
        rest = &body[end + 3..];
    }
    blocks
}

/// The first balanced `{…}` or `[…]` span in `raw`, bracket-matched with
/// awareness of JSON string literals and escapes.
fn balanced_span(raw: &str) -> Option<&str> {
    let start = raw.find(['{', '['])?;
    let bytes = raw.as_bytes();
    let open = bytes[start];
    let close = if open == b'{' { b'}' } else { b']' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            _ if b == open => depth += 1,
            _ if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
