//! Deterministic output paths for downloaded images.
//!
//! Paths look like `{project}/{index}_{slug}.png` with both components
//! sanitized the same way, so a whole batch lands in one folder and
//! sorts in generation order.

/// Longest sanitized component kept, in characters.
const MAX_COMPONENT_CHARS: usize = 30;

/// Builds the relative download path for one generated image.
///
/// The index is padded to three digits; wider indices keep all their
/// digits.
pub fn generate_filename(project: &str, index: usize, slug: &str) -> String {
    format!("{}/{:03}_{}.png", sanitize(project), index, sanitize(slug))
}

/// Normalizes free text into a filesystem-safe component: spaces become
/// hyphens, anything outside ASCII alphanumerics, `_`, `-` and Hangul
/// syllables is dropped, the rest is lowercased and truncated.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c == ' ' { '-' } else { c })
        .filter(|&c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || is_hangul(&c))
        .map(|c| c.to_ascii_lowercase())
        .take(MAX_COMPONENT_CHARS)
        .collect()
}

fn is_hangul(c: &char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(c)
}
