//! Structural patterns: static calls and singletons.

use crate::scanner::LexedSource;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static STATIC_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Za-z_][\w\\]*)::([A-Za-z_]\w*)\s*\(").expect("valid static call regex")
});

static SINGLETON_ACCESSOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bfunction\s+getInstance\s*\(").expect("valid singleton regex")
});

static SINGLETON_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bprivate\s+static\s+(?:\??[\w\\]+\s+)?\$instance\b").expect("valid singleton field regex")
});

/// `Class::method` names called statically, excluding `self`, `parent`
/// and `static`.
pub fn find_static_calls(lexed: &LexedSource<'_>) -> BTreeSet<String> {
    STATIC_CALL
        .captures_iter(lexed.code())
        .filter(|caps| {
            !matches!(
                caps[1].to_ascii_lowercase().as_str(),
                "self" | "parent" | "static"
            )
        })
        .map(|caps| format!("{}::{}", caps[1].trim_start_matches('\\'), &caps[2]))
        .collect()
}

/// Whether a class body (masked code) looks like a singleton.
pub fn is_singleton(class_code: &str) -> bool {
    SINGLETON_ACCESSOR.is_match(class_code) || SINGLETON_FIELD.is_match(class_code)
}
