//! Wildcard pattern matching for namespace and method classification
//!
//! Patterns are matched case-insensitively and support a leading and/or
//! trailing `*`: `Acme.*` (prefix), `*.Save` (suffix), `*Repository*`
//! (contains). Anything else is an exact match.

pub fn is_pattern_match(value: &str, pattern: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }

    let value = value.to_lowercase();
    let pattern = pattern.to_lowercase();

    let starts_wild = pattern.starts_with('*');
    let ends_wild = pattern.ends_with('*');
    let core = pattern.trim_matches('*');

    if core.is_empty() {
        // "*" matches everything
        return true;
    }

    match (starts_wild, ends_wild) {
        (true, true) => value.contains(core),
        (true, false) => value.ends_with(core),
        (false, true) => value.starts_with(core),
        (false, false) => value == core,
    }
}

pub fn matches_any(value: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| is_pattern_match(value, pattern))
}
