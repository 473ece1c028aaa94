//! Function-level analysis: one [`FunctionRecord`] per declaration.

use super::body::FunctionBody;
use super::params::parse_parameters;
use super::phpdoc::{doc_block_before, parse_doc_types};
use super::request_input::detect_request_input;
use super::returns::infer_return_shape;
use crate::complexity::calculate_cyclomatic;
use crate::core::{FunctionRecord, ReturnType};
use crate::scanner::{Declaration, LexedSource};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

static GLOBAL_STATEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bglobal\s+(\$\w+(?:\s*,\s*\$\w+)*)").expect("valid global regex")
});

static GLOBALS_ARRAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\$GLOBALS\s*\[\s*['"](\w+)['"]\s*\]"#).expect("valid $GLOBALS regex")
});

static DATABASE_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:mysql|mysqli|pg|sqlite|sqlite3|odbc|oci|mssql|sqlsrv|db2)_\w+\s*\(",
        r"|->\s*(?:query|prepare|execute|exec|fetch\w*|get_results|get_row|get_var|get_col|insert_id)\s*\(",
        r"|\bnew\s+\\?(?:PDO|mysqli)\b",
        r"|\$wpdb\b",
    ))
    .expect("valid database call regex")
});

static CALL_SITE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Za-z_]\w*)\s*\(").expect("valid call regex"));

/// Language constructs that look like calls.
const CALL_BLACKLIST: &[&str] = &[
    "if", "elseif", "else", "while", "for", "foreach", "switch", "case", "catch", "try", "function",
    "fn", "return", "echo", "print", "array", "list", "isset", "unset", "empty", "include",
    "include_once", "require", "require_once", "declare", "match", "new", "use", "and", "or", "xor",
    "exit", "die", "global", "static", "self", "parent", "clone", "instanceof", "throw", "yield",
];

pub fn analyze_function(
    lexed: &LexedSource<'_>,
    decl: &Declaration,
    class_name: Option<&str>,
    max_calls: usize,
) -> FunctionRecord {
    let parameters = decl
        .params
        .clone()
        .map(|range| parse_parameters(lexed, range))
        .unwrap_or_default();
    let doc = doc_block_before(lexed.text(), decl.header_start)
        .map(parse_doc_types)
        .unwrap_or_default();

    let mut record = FunctionRecord {
        name: decl.name.clone(),
        class_name: class_name.map(str::to_string),
        parameters,
        line_start: decl.start_line,
        line_end: decl.end_line.max(decl.start_line),
        cyclomatic_complexity: 1,
        anonymous_functions: 0,
        calls_database: false,
        uses_ambient_state: BTreeSet::new(),
        uses_request_input: BTreeSet::new(),
        calls_functions: Vec::new(),
        return_type: ReturnType::Unknown,
        return_keys: BTreeSet::new(),
        return_nested_keys: BTreeMap::new(),
        visibility: decl.visibility().map(str::to_string),
        is_static: decl.has_modifier("static"),
        is_abstract: decl.body.is_none(),
        doc_param_types: doc.params,
        doc_return_type: doc.return_type,
        malformed: decl.malformed,
    };

    let Some(range) = decl.body.clone() else {
        return record;
    };
    let body = FunctionBody::new(lexed, range);

    record.cyclomatic_complexity = calculate_cyclomatic(&body.code);
    record.anonymous_functions = body.nested_functions;
    record.calls_database = DATABASE_CALL.is_match(&body.code);
    record.uses_ambient_state = ambient_state(&body);
    record.uses_request_input = detect_request_input(&body.code, &body.stripped);
    record.calls_functions = called_functions(&body.code, max_calls);

    let shape = infer_return_shape(&body);
    record.return_type = shape.return_type;
    record.return_keys = shape.keys;
    record.return_nested_keys = shape.nested_keys;

    record
}

fn ambient_state(body: &FunctionBody<'_>) -> BTreeSet<String> {
    let declared = GLOBAL_STATEMENT.captures_iter(&body.code).flat_map(|caps| {
        caps[1]
            .split(',')
            .map(|name| name.trim().trim_start_matches('$').to_string())
            .collect::<Vec<_>>()
    });
    let indexed = GLOBALS_ARRAY
        .captures_iter(&body.stripped)
        .map(|caps| caps[1].to_string());
    declared.chain(indexed).filter(|name| !name.is_empty()).collect()
}

/// Distinct call targets in first-seen order, at most `max_calls`.
fn called_functions(code: &str, max_calls: usize) -> Vec<String> {
    let bytes = code.as_bytes();
    let mut calls: Vec<String> = Vec::new();

    for caps in CALL_SITE.captures_iter(code) {
        if calls.len() >= max_calls {
            break;
        }
        let Some(name) = caps.get(1) else { continue };
        if name.start() > 0 && bytes[name.start() - 1] == b'$' {
            continue;
        }
        let lower = name.as_str().to_ascii_lowercase();
        if CALL_BLACKLIST.contains(&lower.as_str()) {
            continue;
        }
        let before = code[..name.start()].trim_end();
        if ends_with_word(before, "function") || ends_with_word(before, "new") {
            continue;
        }
        if !calls.iter().any(|c| c == name.as_str()) {
            calls.push(name.as_str().to_string());
        }
    }

    calls
}

fn ends_with_word(text: &str, word: &str) -> bool {
    let Some(at) = text.len().checked_sub(word.len()) else {
        return false;
    };
    match text.get(at..) {
        Some(tail) if tail.eq_ignore_ascii_case(word) => text[..at]
            .chars()
            .next_back()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_')),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RequestInput;
    use crate::scanner::{declarations, lex};
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn analyze(src: &str) -> Vec<FunctionRecord> {
        let lexed = lex(src);
        declarations(&lexed)
            .map(|decl| analyze_function(&lexed, &decl, None, 20))
            .collect()
    }

    #[test]
    fn test_full_record() {
        let src = indoc! {r#"
            <?php
            /**
             * @param int $id
             * @return array
             */
            function load_user($id, $with_orders = false) {
                global $db, $config;
                $user = array();
                $res = mysql_query("SELECT name FROM users WHERE id = " . (int) $id);
                if ($row = mysql_fetch_assoc($res)) {
                    $user['name'] = $row['name'];
                    $user['orders']['count'] = count_orders($id);
                }
                if ($with_orders && isset($_GET['page'])) {
                    $user['page'] = (int) $_GET['page'];
                }
                log_access($_SESSION['uid']);
                return $user;
            }
        "#};
        let records = analyze(src);
        assert_eq!(records.len(), 1);
        let f = &records[0];
        assert_eq!(f.name, "load_user");
        let names: Vec<_> = f.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["id", "with_orders"]);
        assert_eq!(f.parameters[1].default.as_deref(), Some("false"));
        assert_eq!((f.line_start, f.line_end), (6, 19));
        assert_eq!(f.cyclomatic_complexity, 4);
        assert!(f.calls_database);
        assert_eq!(
            f.uses_ambient_state.iter().cloned().collect::<Vec<_>>(),
            vec!["config".to_string(), "db".to_string()]
        );
        assert_eq!(
            f.uses_request_input.iter().copied().collect::<Vec<_>>(),
            vec![RequestInput::Query, RequestInput::Session]
        );
        assert_eq!(
            f.calls_functions,
            vec!["mysql_query", "mysql_fetch_assoc", "count_orders", "log_access"]
        );
        assert_eq!(f.return_type, ReturnType::Array);
        assert!(f.return_keys.contains("orders"));
        assert!(f.return_nested_keys["orders"].contains("count"));
        assert_eq!(f.doc_param_types["id"], "int");
        assert_eq!(f.doc_return_type.as_deref(), Some("array"));
        assert!(!f.malformed);
    }

    #[test]
    fn test_call_cap_and_dedup() {
        let calls: String = (0..30).map(|i| format!("f{i}(); f{i}(); ")).collect();
        let src = format!("<?php function many() {{ {calls} }}");
        let f = &analyze(&src)[0];
        assert_eq!(f.calls_functions.len(), 20);
        assert_eq!(f.calls_functions[0], "f0");
        assert_eq!(f.calls_functions[19], "f19");
    }

    #[test]
    fn test_variable_functions_and_constructors_are_not_calls() {
        let src = "<?php function f() { $cb(); $o = new Mailer($x); $o->send(); strlen('a'); }";
        let f = &analyze(src)[0];
        assert_eq!(f.calls_functions, vec!["send", "strlen"]);
    }

    #[test]
    fn test_closures_are_counted_and_flagged() {
        let src = "<?php function f($xs) { return array_filter($xs, function ($x) { return $x > 0 && $x < 9; }); }";
        let f = &analyze(src)[0];
        assert_eq!(f.anonymous_functions, 1);
        assert_eq!(f.cyclomatic_complexity, 2);
        assert_eq!(f.return_type, ReturnType::Unknown);
    }

    #[test]
    fn test_globals_array_access() {
        let src = "<?php function f() { return $GLOBALS['settings']['theme']; }";
        let f = &analyze(src)[0];
        assert!(f.uses_ambient_state.contains("settings"));
    }

    #[test]
    fn test_malformed_function_still_produces_record() {
        let src = "<?php\nfunction broken($a) {\n  if ($a) {\n    return true;\n";
        let f = &analyze(src)[0];
        assert!(f.malformed);
        assert!(f.line_end >= f.line_start);
        assert!(f.cyclomatic_complexity >= 1);
        assert_eq!(f.return_type, ReturnType::Boolean);
    }
}
