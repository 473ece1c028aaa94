use super::function::analyze_function;
use super::patterns::is_singleton;
use crate::core::{AnalysisWarning, ClassKind, ClassRecord, FunctionRecord, WarningKind};
use crate::scanner::{declarations, declarations_in, Declaration, DeclarationKind, LexedSource};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static EXTENDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bextends\s+([\w\\]+)").expect("valid extends regex"));

static IMPLEMENTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bimplements\s+([\w\\]+(?:\s*,\s*[\w\\]+)*)").expect("valid implements regex")
});

static OUTPUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:echo|print|printf)\b|<\?=").expect("valid output regex"));

static HEADER_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bheader\s*\(").expect("valid header regex"));

const ENTRY_NAMES: &[&str] = &["index", "main", "home", "login", "register"];
const LIBRARY_NAME_MARKERS: &[&str] = &["include", "inc", "lib", "func", "class", "config"];

#[derive(Debug, Default)]
pub struct FileStructure {
    pub functions: Vec<FunctionRecord>,
    pub classes: Vec<ClassRecord>,
    pub warnings: Vec<AnalysisWarning>,
}

/// Functions, classes and methods of one file, in source order.
pub fn analyze_structure(lexed: &LexedSource<'_>, path: &str, max_calls: usize) -> FileStructure {
    let mut structure = FileStructure::default();

    for decl in declarations(lexed) {
        if decl.malformed {
            structure.warnings.push(malformed_warning(&decl, path));
        }
        match decl.kind {
            DeclarationKind::Function => {
                let _function = crate::observability::set_current_function(&decl.name);
                structure
                    .functions
                    .push(analyze_function(lexed, &decl, None, max_calls));
            }
            DeclarationKind::Class | DeclarationKind::Interface | DeclarationKind::Trait => {
                let class = analyze_class(lexed, &decl, path, max_calls, &mut structure);
                structure.classes.push(class);
            }
        }
    }

    structure
}

fn analyze_class(
    lexed: &LexedSource<'_>,
    decl: &Declaration,
    path: &str,
    max_calls: usize,
    structure: &mut FileStructure,
) -> ClassRecord {
    let header = decl.header_tail(lexed.code());
    let mut methods = Vec::new();
    let mut singleton = false;

    if let Some(body) = decl.body.clone() {
        let inner_end = if decl.malformed { body.end } else { body.end - 1 };
        singleton = is_singleton(&lexed.code()[body.clone()]);
        for method in declarations_in(lexed, body.start + 1..inner_end) {
            if method.kind != DeclarationKind::Function {
                continue;
            }
            if method.malformed && !decl.malformed {
                structure.warnings.push(malformed_warning(&method, path));
            }
            let qualified = format!("{}::{}", decl.name, method.name);
            let _function = crate::observability::set_current_function(qualified);
            methods.push(method.name.clone());
            structure
                .functions
                .push(analyze_function(lexed, &method, Some(&decl.name), max_calls));
        }
    }

    ClassRecord {
        name: decl.name.clone(),
        kind: match decl.kind {
            DeclarationKind::Interface => ClassKind::Interface,
            DeclarationKind::Trait => ClassKind::Trait,
            _ => ClassKind::Class,
        },
        extends: EXTENDS
            .captures(header)
            .map(|caps| caps[1].trim_start_matches('\\').to_string()),
        implements: IMPLEMENTS
            .captures(header)
            .map(|caps| {
                caps[1]
                    .split(',')
                    .map(|name| name.trim().trim_start_matches('\\').to_string())
                    .collect()
            })
            .unwrap_or_default(),
        line_start: decl.start_line,
        line_end: decl.end_line.max(decl.start_line),
        methods,
        is_singleton: singleton,
        malformed: decl.malformed,
    }
}

fn malformed_warning(decl: &Declaration, path: &str) -> AnalysisWarning {
    AnalysisWarning::new(
        WarningKind::MalformedDeclaration,
        format!(
            "'{}' never closes; record truncated at end of file",
            decl.name
        ),
    )
    .in_file(path)
    .at_line(decl.start_line)
}

/// Likelihood that a file is requested directly rather than included.
/// Never negative.
pub fn entry_point_score(path: &str, lexed: &LexedSource<'_>, function_count: usize) -> f64 {
    let code = lexed.code();
    let mut score: f64 = 0.0;

    if code.contains("$_GET") {
        score += 2.0;
    }
    if code.contains("$_POST") {
        score += 2.0;
    }
    if code.contains("$_REQUEST") {
        score += 1.5;
    }
    if lexed.html_lines() > 5 {
        score += 1.0;
    }
    if code.contains("$_SESSION") {
        score += 0.5;
    }
    if lexed.text().trim_start().starts_with("<?") {
        score += 0.5;
    }
    if HEADER_CALL.is_match(code) {
        score += 1.0;
    }
    let produces_output = lexed.html_lines() > 0 || OUTPUT.is_match(lexed.stripped());
    if function_count > 3 && !produces_output {
        score -= 2.0;
    }

    let stem = Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if ENTRY_NAMES.contains(&stem.as_str()) {
        score += 1.5;
    }
    if LIBRARY_NAME_MARKERS.iter().any(|marker| stem.contains(marker)) {
        score -= 2.0;
    }

    score.max(0.0)
}
