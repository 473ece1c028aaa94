//! `include`/`require` statements as dependency edges.

use crate::scanner::{matching_close, LexedSource};
use crate::utils::{normalize_lexically, squash_whitespace, to_key, truncate_chars};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

static INCLUDE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(include_once|require_once|include|require)\b").expect("valid include regex")
});

static DIR_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:__DIR__|dirname\s*\(\s*__FILE__\s*\))\s*\.\s*$").expect("valid dir prefix regex")
});

const SYMBOLIC_LENGTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludeKind {
    Include,
    IncludeOnce,
    Require,
    RequireOnce,
}

impl IncludeKind {
    fn parse(keyword: &str) -> Self {
        match keyword.to_ascii_lowercase().as_str() {
            "include_once" => Self::IncludeOnce,
            "require" => Self::Require,
            "require_once" => Self::RequireOnce,
            _ => Self::Include,
        }
    }
}

/// Where an include points: a corpus-relative path when the target is a
/// literal, otherwise the expression text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludeTarget {
    Resolved(String),
    Symbolic(String),
}

impl IncludeTarget {
    pub fn resolved(&self) -> Option<&str> {
        match self {
            IncludeTarget::Resolved(path) => Some(path),
            IncludeTarget::Symbolic(_) => None,
        }
    }
}

impl std::fmt::Display for IncludeTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncludeTarget::Resolved(path) => write!(f, "{path}"),
            IncludeTarget::Symbolic(expr) => write!(f, "<{expr}>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub source_file: String,
    pub target: IncludeTarget,
    pub kind: IncludeKind,
    pub line: usize,
    /// Whether a resolved target is one of the analysed files. Set when the
    /// corpus is finished.
    #[serde(default)]
    pub in_corpus: bool,
}

/// Include edges of one file. `source_file` is the corpus-relative path of
/// the including file; literal targets resolve against its directory.
pub fn extract_includes(lexed: &LexedSource<'_>, source_file: &str) -> Vec<DependencyEdge> {
    let code = lexed.code();
    let base = Path::new(source_file).parent().unwrap_or(Path::new(""));
    let mut edges = Vec::new();

    for m in INCLUDE.find_iter(code) {
        if preceded_by_accessor(code.as_bytes(), m.start()) {
            continue;
        }
        let end = argument_end(code.as_bytes(), m.end());
        let Some(target) = classify(lexed, m.end()..end, base) else {
            continue;
        };
        edges.push(DependencyEdge {
            source_file: source_file.to_string(),
            target,
            kind: IncludeKind::parse(m.as_str()),
            line: lexed.line_of(m.start()),
            in_corpus: false,
        });
    }

    edges
}

/// `$obj->include(` and `Foo::require(` are method calls.
fn preceded_by_accessor(code: &[u8], start: usize) -> bool {
    let before = code[..start].trim_ascii_end();
    before.ends_with(b"->") || before.ends_with(b"::") || before.ends_with(b"$")
}

/// End of the include argument. A parenthesised argument ends at its closing
/// paren unless it is concatenated further, so `include('a.php') or die()`
/// stays a literal.
fn argument_end(code: &[u8], from: usize) -> usize {
    let end = statement_end(code, from);
    let open = from + (code[from..end].len() - code[from..end].trim_ascii_start().len());
    if code.get(open) != Some(&b'(') {
        return end;
    }
    matching_close(code, open, end, b'(', b')')
        .map(|close| close + 1)
        .filter(|&after| !code[after..end].trim_ascii_start().starts_with(b"."))
        .unwrap_or(end)
}

fn statement_end(code: &[u8], from: usize) -> usize {
    let mut depth = 0usize;
    let mut pos = from;
    while pos < code.len() {
        match code[pos] {
            b'(' => depth += 1,
            b')' if depth == 0 => break,
            b')' => depth -= 1,
            b';' if depth == 0 => break,
            b'?' if depth == 0 && code.get(pos + 1) == Some(&b'>') => break,
            _ => {}
        }
        pos += 1;
    }
    pos
}

fn classify(lexed: &LexedSource<'_>, range: std::ops::Range<usize>, base: &Path) -> Option<IncludeTarget> {
    let code = &lexed.code()[range.clone()];
    let expression = strip_parens(code.trim());
    if expression.is_empty() {
        return None;
    }

    let strings = lexed.strings_in(range.clone());
    if let [literal] = strings {
        let literal_code = &lexed.code()[literal.start..literal.end];
        let interpolated = literal.style.interpolates() && literal.value.contains('$');
        if !interpolated {
            if expression == literal_code {
                return Some(resolve(base, &literal.value));
            }
            let prefix = expression.strip_suffix(literal_code).unwrap_or_default();
            if !prefix.is_empty() && DIR_PREFIX.is_match(prefix) {
                return Some(resolve(base, literal.value.trim_start_matches(['/', '\\'])));
            }
        }
    }

    let text = &lexed.text()[range];
    Some(IncludeTarget::Symbolic(truncate_chars(
        &squash_whitespace(strip_parens(text.trim())),
        SYMBOLIC_LENGTH,
    )))
}

fn strip_parens(mut expr: &str) -> &str {
    while let Some(inner) = expr.strip_prefix('(').and_then(|e| e.strip_suffix(')')) {
        if !balanced(inner) {
            break;
        }
        expr = inner.trim();
    }
    expr
}

fn balanced(expr: &str) -> bool {
    let mut depth = 0i32;
    for b in expr.bytes() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn resolve(base: &Path, literal: &str) -> IncludeTarget {
    let literal = literal.replace('\\', "/");
    if literal.starts_with('/') || literal.contains("://") {
        return IncludeTarget::Resolved(literal);
    }
    IncludeTarget::Resolved(to_key(&normalize_lexically(&base.join(literal))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::lex;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn targets(src: &str, file: &str) -> Vec<(IncludeKind, IncludeTarget)> {
        extract_includes(&lex(src), file)
            .into_iter()
            .map(|e| (e.kind, e.target))
            .collect()
    }

    #[test]
    fn test_literal_targets_resolve_against_including_file() {
        let src = indoc! {r#"
            <?php
            include 'header.php';
            require_once("../lib/db.inc");
            include_once __DIR__ . '/partials/nav.php';
            require dirname(__FILE__) . '/config.php';
        "#};
        assert_eq!(
            targets(src, "admin/index.php"),
            vec![
                (IncludeKind::Include, IncludeTarget::Resolved("admin/header.php".into())),
                (IncludeKind::RequireOnce, IncludeTarget::Resolved("lib/db.inc".into())),
                (IncludeKind::IncludeOnce, IncludeTarget::Resolved("admin/partials/nav.php".into())),
                (IncludeKind::Require, IncludeTarget::Resolved("admin/config.php".into())),
            ]
        );
    }

    #[test]
    fn test_computed_targets_are_symbolic() {
        let src = "<?php\ninclude $page . '.php';\nrequire \"modules/$mod.php\";\n";
        assert_eq!(
            targets(src, "index.php"),
            vec![
                (IncludeKind::Include, IncludeTarget::Symbolic("$page . '.php'".into())),
                (IncludeKind::Require, IncludeTarget::Symbolic("\"modules/$mod.php\"".into())),
            ]
        );
    }

    #[test]
    fn test_strings_comments_and_methods_are_not_includes() {
        let src = "<?php\n// include 'old.php';\n$s = 'require x';\n$loader->include('a.php');\n";
        assert!(targets(src, "a.php").is_empty());
    }

    #[test]
    fn test_parenthesised_literal_with_fallback() {
        let src = "<?php\ninclude('lib/a.php') or die('missing');\n";
        assert_eq!(
            targets(src, "index.php"),
            vec![(IncludeKind::Include, IncludeTarget::Resolved("lib/a.php".into()))]
        );
    }

    #[test]
    fn test_edge_lines() {
        let src = "<?php\n\n\ninclude 'a.php'; include 'b.php';\n";
        let lines: Vec<_> = extract_includes(&lex(src), "x.php").iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![4, 4]);
    }
}
