use std::sync::OnceLock;

use regex::Regex;

static NAME_PATTERN: OnceLock<Regex> = OnceLock::new();

fn name_pattern() -> &'static Regex {
    NAME_PATTERN.get_or_init(|| {
        Regex::new(r"[A-Z][a-z]+(?:\s+[A-Z][a-z]+)+").expect("valid name pattern")
    })
}

/// Returns the first run of two or more capitalised words.
///
/// This also matches headings such as "Work Experience"; no attempt is made
/// to tell names apart from other capitalised phrases.
pub fn find_name(text: &str) -> Option<String> {
    name_pattern().find(text).map(|m| m.as_str().to_string())
}
