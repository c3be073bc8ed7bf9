//! Structural checks on generated markdown documents.
//!
//! A document is accepted when it contains a heading matching each required
//! section title. Matching is case- and punctuation-insensitive and ignores
//! heading order.

/// Normalize a heading or section title for comparison: lowercase
/// alphanumerics and single spaces only.
fn normalize(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut last_space = true;
    for c in title.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    out.trim_end().to_string()
}

/// Extract the normalized text of every markdown heading in `raw`.
fn headings(raw: &str) -> Vec<String> {
    raw.lines()
        .filter_map(|line| {
            let trimmed = line.trim_start();
            trimmed.starts_with('#').then(|| {
                normalize(trimmed.trim_start_matches('#'))
            })
        })
        .collect()
}

/// Check that `raw` contains a heading for each required section title.
///
/// Returns the list of missing titles (original casing) when the check
/// fails; an empty result means the document is structurally acceptable.
pub fn missing_sections(raw: &str, required: &[&str]) -> Vec<String> {
    let found = headings(raw);
    required
        .iter()
        .filter(|title| {
            let want = normalize(title);
            !found.iter().any(|h| *h == want)
        })
        .map(|title| title.to_string())
        .collect()
}
