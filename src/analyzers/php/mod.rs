//! PHP source analysis.
//!
//! Everything here works on a [`LexedSource`]: the masked views make brace
//! matching and keyword search immune to strings and comments, so no parser
//! is needed.

pub mod body;
pub mod config_values;
pub mod external_api;
pub mod function;
pub mod params;
pub mod patterns;
pub mod phpdoc;
pub mod request_input;
pub mod returns;
pub mod structure;

use super::{Analyzer, FileAnalysis};
use crate::config::AnalysisSettings;
use crate::core::{AnalysisWarning, FileRecord, SourceFile, WarningKind};
use crate::database::extract_queries;
use crate::dependencies::extract_includes;
use crate::scanner::{lex, LexedSource};
use crate::security::{analyze_security_patterns, RuleSet};
use tracing::debug;

pub use function::analyze_function;
pub use structure::{analyze_structure, entry_point_score, FileStructure};

/// Lines of each kind a file needs before it counts as mixed PHP/HTML.
const MIXED_THRESHOLD: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct PhpAnalyzer {
    settings: AnalysisSettings,
    rules: RuleSet,
}

impl PhpAnalyzer {
    pub fn new(settings: AnalysisSettings, rules: RuleSet) -> Self {
        Self { settings, rules }
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    fn file_record(&self, source: &SourceFile, lexed: &LexedSource<'_>, structure: FileStructure) -> FileRecord {
        let FileStructure {
            functions, classes, ..
        } = structure;
        let php_lines = lexed.php_lines();
        let html_lines = lexed.html_lines();

        FileRecord {
            path: source.path.clone(),
            line_count: source.line_count,
            php_lines,
            html_lines,
            is_mixed: php_lines > MIXED_THRESHOLD && html_lines > MIXED_THRESHOLD,
            entry_point_score: entry_point_score(&source.path, lexed, functions.len()),
            request_inputs: request_input::detect_request_input(lexed.code(), lexed.stripped()),
            functions,
            classes,
            queries: extract_queries(
                lexed,
                self.settings.query_snippet_length,
                self.settings.max_queries_per_file,
            ),
            config_values: config_values::extract_config_values(lexed),
            external_calls: external_api::find_external_calls(lexed, self.settings.snippet_length),
            static_calls: patterns::find_static_calls(lexed),
        }
    }
}

impl Analyzer for PhpAnalyzer {
    fn analyze(&self, source: &SourceFile) -> FileAnalysis {
        let lexed = lex(&source.text);
        let mut structure = analyze_structure(&lexed, &source.path, self.settings.max_calls);
        let mut warnings = std::mem::take(&mut structure.warnings);

        if let Some(open) = lexed.unterminated() {
            warnings.push(
                AnalysisWarning::new(
                    WarningKind::UnterminatedLiteral,
                    format!("{} opened here is never closed", open.construct),
                )
                .in_file(source.path.clone())
                .at_line(open.line),
            );
        }

        let findings = analyze_security_patterns(
            &lexed,
            &source.path,
            &self.rules,
            self.settings.snippet_length,
        );
        let edges = extract_includes(&lexed, &source.path);
        let record = self.file_record(source, &lexed, structure);

        debug!(
            file = %source.path,
            functions = record.functions.len(),
            queries = record.queries.len(),
            findings = findings.len(),
            includes = edges.len(),
            "analyzed file"
        );

        FileAnalysis {
            record,
            findings,
            edges,
            warnings,
        }
    }

    fn name(&self) -> &'static str {
        "php"
    }
}
