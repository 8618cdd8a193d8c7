use std::sync::OnceLock;

use phonenumber::country;
use phonenumber::Mode;
use regex::Regex;

/// Region used to interpret numbers written without a `+` country code.
pub const DEFAULT_REGION: country::Id = country::Id::US;

static CANDIDATE_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Loose shape of a written phone number: optional country code (with or
/// without `+`), an area/trunk group (optionally parenthesised) and two more
/// digit groups, separated by spaces, dots or dashes.
fn candidate_pattern() -> &'static Regex {
    CANDIDATE_PATTERN.get_or_init(|| {
        Regex::new(r"(?:\+?\d{1,3}[ .-]?)?(?:\(\d{1,4}\)|\d{1,4})[ .-]?\d{2,4}[ .-]?\d{3,4}")
            .expect("valid phone candidate pattern")
    })
}

/// Returns the first valid phone number in `text`, formatted as E.164.
///
/// Candidates are located with a loose pattern, then parsed against `region`
/// and kept only when the number is valid for its country. After a rejected
/// candidate the scan resumes one character later, so a valid number that
/// overlaps it is still found.
pub fn find_phone(text: &str, region: country::Id) -> Option<String> {
    let pattern = candidate_pattern();
    let mut pos = 0;
    while let Some(m) = pattern.find_at(text, pos) {
        if is_isolated(text, m.start(), m.end()) {
            if let Some(number) = normalize(m.as_str(), region) {
                return Some(number);
            }
        }
        pos = m.start() + text[m.start()..].chars().next().map_or(1, char::len_utf8);
    }
    None
}

/// Parses one candidate and formats it as E.164 if it is a valid number.
pub fn normalize(candidate: &str, region: country::Id) -> Option<String> {
    let mut compact = String::with_capacity(candidate.len());
    if candidate.trim_start().starts_with('+') {
        compact.push('+');
    }
    compact.extend(candidate.chars().filter(char::is_ascii_digit));

    let number = phonenumber::parse(Some(region), &compact).ok()?;
    if !phonenumber::is_valid(&number) {
        return None;
    }
    Some(number.format().mode(Mode::E164).to_string())
}

/// Rejects candidates glued to surrounding digits or words, e.g. the tail of a
/// longer account number.
fn is_isolated(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    let glued_before = before.is_some_and(|c| c.is_alphanumeric() || c == '+');
    let glued_after = after.is_some_and(|c| c.is_ascii_digit());
    !glued_before && !glued_after
}
