//! The versioned rule table.
//!
//! All patterns are compiled once into a [`RegexSet`] prefilter plus one
//! [`Regex`] per rule. Rules are matched line by line against the
//! comment-stripped view, so string contents stay visible while commented-out
//! code is ignored.

use super::types::{SecurityCategory, Severity};
use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};
use std::collections::BTreeSet;

/// Bumped whenever a rule is added, removed or changes meaning.
pub const RULESET_VERSION: &str = "2026.10";

#[derive(Debug)]
pub struct Rule {
    pub id: &'static str,
    pub pattern: &'static str,
    pub category: SecurityCategory,
    pub severity: Severity,
    pub description: &'static str,
}

const fn rule(
    id: &'static str,
    category: SecurityCategory,
    severity: Severity,
    pattern: &'static str,
    description: &'static str,
) -> Rule {
    Rule {
        id,
        pattern,
        category,
        severity,
        description,
    }
}

use SecurityCategory::*;
use Severity::*;

/// Table order breaks severity ties during deduplication.
pub static RULES: &[Rule] = &[
    rule(
        "SQL001",
        SqlInjection,
        Critical,
        r#"(?i)["']\s*(?:SELECT|INSERT|UPDATE|DELETE|REPLACE)\b[^"']*["']+\s*[.+]\s*[$A-Za-z_(]"#,
        "query text concatenated with a value",
    ),
    rule(
        "SQL002",
        SqlInjection,
        Critical,
        r#"(?i)(?:\b(?:mysql|mysqli|pg|sqlite|mssql)_query\s*\([^;]*|->\s*(?:query|exec)\s*\(\s*)"[^"]*\$[A-Za-z_{]"#,
        "variable interpolated into a query call",
    ),
    rule(
        "SQL003",
        SqlInjection,
        Critical,
        r"(?i)\b(?:SELECT|INSERT|UPDATE|DELETE)\b.*\$_(?:GET|POST|REQUEST|COOKIE)\b",
        "request input used directly in query text",
    ),
    rule(
        "SQL004",
        SqlInjection,
        High,
        r"(?i)\b(?:mysql|mysqli|pg)_query\s*\((?:[^,;]+,\s*)?\$\w+\s*\.",
        "query argument built by concatenation",
    ),
    rule(
        "SQL005",
        SqlInjection,
        High,
        r#"(?i)"\s*(?:SELECT|INSERT|UPDATE|DELETE)\b[^"]*\$[A-Za-z_{]"#,
        "variable interpolated into query text",
    ),
    rule(
        "XSS001",
        UnescapedOutput,
        High,
        r"(?i)\b(?:echo|print)\b\s*\(?\s*\$_(?:GET|POST|REQUEST|COOKIE|SERVER)\b",
        "request input echoed without escaping",
    ),
    rule(
        "XSS002",
        UnescapedOutput,
        High,
        r"<\?=\s*\$_(?:GET|POST|REQUEST|COOKIE|SERVER)\b",
        "request input in short echo tag",
    ),
    rule(
        "XSS003",
        UnescapedOutput,
        Medium,
        r"(?i)\becho\s+\$\w+(?:\[[^\]]*\])*\s*;",
        "variable echoed without escaping",
    ),
    rule(
        "PATH001",
        PathTraversal,
        Critical,
        r"(?i)\b(?:include|require)(?:_once)?\b\s*\(?\s*\$_(?:GET|POST|REQUEST|COOKIE)\b",
        "request input used as include target",
    ),
    rule(
        "PATH002",
        PathTraversal,
        Critical,
        r"(?i)\b(?:file_get_contents|file_put_contents|fopen|readfile|file|unlink)\s*\(\s*\$_(?:GET|POST|REQUEST|COOKIE)\b",
        "request input used as file path",
    ),
    rule(
        "PATH003",
        PathTraversal,
        High,
        r#"(?i)\b(?:include|require|fopen|file_get_contents|readfile)(?:_once)?\b\s*\(?\s*["'][^"']*["']\s*\.\s*\$_(?:GET|POST|REQUEST|COOKIE)\b"#,
        "file path concatenated with request input",
    ),
    rule(
        "EXEC001",
        DangerousExecution,
        Critical,
        r"(?i)\beval\s*\(",
        "eval of dynamic code",
    ),
    rule(
        "EXEC002",
        DangerousExecution,
        Critical,
        r"(?i)(?:^|[^>:$\w])(?:exec|system|passthru|shell_exec|popen|proc_open)\s*\(\s*\$",
        "shell command built from a variable",
    ),
    rule(
        "EXEC003",
        DangerousExecution,
        Critical,
        r"`[^`]*\$[A-Za-z_{]",
        "variable in backtick shell execution",
    ),
    rule(
        "EXEC004",
        DangerousExecution,
        High,
        r"(?i)\bcreate_function\s*\(",
        "create_function compiles code at runtime",
    ),
    rule(
        "EXEC005",
        DangerousExecution,
        Critical,
        r#"(?i)\bpreg_replace\s*\(\s*['"]/[^'"]*/[a-z]*e[a-z]*['"]"#,
        "preg_replace with the /e modifier",
    ),
    rule(
        "EXEC006",
        DangerousExecution,
        Critical,
        r"(?i)\bunserialize\s*\(\s*\$_(?:GET|POST|REQUEST|COOKIE)\b",
        "unserialize of request input",
    ),
    rule(
        "EXEC007",
        DangerousExecution,
        High,
        r"(?i)\bassert\s*\(\s*\$",
        "assert of a variable expression",
    ),
    rule(
        "INJ001",
        VariableInjection,
        High,
        r"(?i)\bextract\s*\(\s*\$_(?:GET|POST|REQUEST|COOKIE)\b",
        "extract of request input",
    ),
    rule(
        "INJ002",
        VariableInjection,
        High,
        r"(?i)\bparse_str\s*\(\s*\$_",
        "parse_str of request input",
    ),
    rule(
        "INJ003",
        VariableInjection,
        Medium,
        r"\$\$[A-Za-z_]",
        "variable variable",
    ),
    rule(
        "HASH001",
        WeakHash,
        High,
        r"(?i)\bmd5\s*\([^;]*pass",
        "md5 used on a password",
    ),
    rule(
        "HASH002",
        WeakHash,
        Medium,
        r"(?i)\bsha1\s*\([^;]*pass",
        "sha1 used on a password",
    ),
    rule(
        "HASH003",
        WeakHash,
        Low,
        r"(?i)\b(?:md5|sha1|crc32)\s*\(",
        "weak hash function",
    ),
    rule(
        "RAND001",
        InsecureRandom,
        Low,
        r"(?i)(?:^|[^>:$\w])(?:rand|mt_rand)\s*\(",
        "non-cryptographic random number",
    ),
    rule(
        "RAND002",
        InsecureRandom,
        Low,
        r"(?i)\b(?:uniqid|lcg_value)\s*\(",
        "predictable token source",
    ),
];

struct CompiledRules {
    prefilter: RegexSet,
    patterns: Vec<Regex>,
}

static COMPILED: Lazy<CompiledRules> = Lazy::new(|| CompiledRules {
    prefilter: RegexSet::new(RULES.iter().map(|r| r.pattern)).expect("valid rule table"),
    patterns: RULES
        .iter()
        .map(|r| Regex::new(r.pattern).expect("valid rule pattern"))
        .collect(),
});

/// The enabled subset of [`RULES`].
#[derive(Debug, Clone)]
pub struct RuleSet {
    enabled: Vec<bool>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            enabled: vec![true; RULES.len()],
        }
    }
}

impl RuleSet {
    /// Unknown ids are returned so the caller can report them.
    pub fn with_disabled<S: AsRef<str>>(disabled: &[S]) -> (Self, Vec<String>) {
        let wanted: BTreeSet<String> = disabled
            .iter()
            .map(|id| id.as_ref().to_ascii_uppercase())
            .collect();
        let enabled = RULES.iter().map(|r| !wanted.contains(r.id)).collect();
        let unknown = wanted
            .into_iter()
            .filter(|id| !RULES.iter().any(|r| r.id == id))
            .collect();
        (Self { enabled }, unknown)
    }

    /// Enabled rules matching `line`, in table order.
    pub fn matching<'s>(&'s self, line: &'s str) -> impl Iterator<Item = &'static Rule> + 's {
        let compiled = &*COMPILED;
        compiled
            .prefilter
            .matches(line)
            .into_iter()
            .filter(move |&idx| self.enabled[idx] && compiled.patterns[idx].is_match(line))
            .map(|idx| &RULES[idx])
    }

    pub fn enabled_rules(&self) -> impl Iterator<Item = &'static Rule> + '_ {
        RULES
            .iter()
            .zip(&self.enabled)
            .filter(|(_, on)| **on)
            .map(|(rule, _)| rule)
    }
}
