pub mod errors;
pub mod metrics;

use crate::database::{QueryRecord, TableSchema};
use crate::dependencies::DependencyEdge;
use crate::security::SecurityFinding;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

pub use errors::{Error, Result};

/// A source file as read from disk, after decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the analysis root, `/`-separated.
    pub path: String,
    pub text: String,
    pub line_count: usize,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let line_count = count_lines(&text);
        Self {
            path: path.into(),
            text,
            line_count,
        }
    }
}

pub fn count_lines(text: &str) -> usize {
    if text.is_empty() {
        0
    } else {
        text.lines().count()
    }
}

/// Category of request data read through a superglobal.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[serde(rename_all = "snake_case")]
pub enum RequestInput {
    Query,
    Body,
    Session,
    Cookie,
    Upload,
    Server,
}

impl std::fmt::Display for RequestInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        static DISPLAY_STRINGS: &[(RequestInput, &str)] = &[
            (RequestInput::Query, "query"),
            (RequestInput::Body, "body"),
            (RequestInput::Session, "session"),
            (RequestInput::Cookie, "cookie"),
            (RequestInput::Upload, "upload"),
            (RequestInput::Server, "server"),
        ];

        let display_str = DISPLAY_STRINGS
            .iter()
            .find(|(input, _)| input == self)
            .map(|(_, s)| *s)
            .unwrap_or("unknown");

        write!(f, "{display_str}")
    }
}

/// Inferred shape of a function's return value.
///
/// Inference is heuristic; `Mixed` and `Unknown` carry the uncertainty
/// instead of a guess.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReturnType {
    Array,
    Boolean,
    Mixed,
    Void,
    #[default]
    Unknown,
}

impl std::fmt::Display for ReturnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReturnType::Array => "array",
            ReturnType::Boolean => "boolean",
            ReturnType::Mixed => "mixed",
            ReturnType::Void => "void",
            ReturnType::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Parameter {
    /// Variable name without the leading `$`.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<String>,
    /// Default value, kept only when it is a simple literal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default)]
    pub by_reference: bool,
    #[serde(default)]
    pub variadic: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FunctionRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    pub parameters: Vec<Parameter>,
    pub line_start: usize,
    pub line_end: usize,
    pub cyclomatic_complexity: u32,
    /// Closures and nested named functions whose branches are counted in
    /// `cyclomatic_complexity`.
    pub anonymous_functions: u32,
    pub calls_database: bool,
    pub uses_ambient_state: BTreeSet<String>,
    pub uses_request_input: BTreeSet<RequestInput>,
    pub calls_functions: Vec<String>,
    pub return_type: ReturnType,
    pub return_keys: BTreeSet<String>,
    pub return_nested_keys: BTreeMap<String, BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    pub is_static: bool,
    /// Body-less declaration (abstract or interface method).
    pub is_abstract: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub doc_param_types: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_return_type: Option<String>,
    pub malformed: bool,
}

impl FunctionRecord {
    /// `Class::method` for methods, the bare name otherwise.
    pub fn qualified_name(&self) -> String {
        match &self.class_name {
            Some(class) => format!("{class}::{}", self.name),
            None => self.name.clone(),
        }
    }

    pub fn is_complex(&self, threshold: u32) -> bool {
        self.cyclomatic_complexity > threshold
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    Class,
    Interface,
    Trait,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClassRecord {
    pub name: String,
    pub kind: ClassKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implements: Vec<String>,
    pub line_start: usize,
    pub line_end: usize,
    pub methods: Vec<String>,
    pub is_singleton: bool,
    pub malformed: bool,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    Define,
    ConfigArray,
    Variable,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigValue {
    pub name: String,
    pub value: String,
    pub source: ConfigSource,
    pub line: usize,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExternalCallKind {
    Curl,
    CurlUrl,
    HttpStream,
    Socket,
    Soap,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExternalCall {
    pub kind: ExternalCallKind,
    pub line: usize,
    pub snippet: String,
}

/// Per-file metadata kept in the corpus model. The raw text is not retained.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    pub path: String,
    pub line_count: usize,
    pub php_lines: usize,
    pub html_lines: usize,
    pub is_mixed: bool,
    pub entry_point_score: f64,
    pub request_inputs: BTreeSet<RequestInput>,
    pub functions: Vec<FunctionRecord>,
    pub classes: Vec<ClassRecord>,
    pub queries: Vec<QueryRecord>,
    pub config_values: Vec<ConfigValue>,
    pub external_calls: Vec<ExternalCall>,
    pub static_calls: BTreeSet<String>,
}

impl FileRecord {
    pub fn empty(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line_count: 0,
            php_lines: 0,
            html_lines: 0,
            is_mixed: false,
            entry_point_score: 0.0,
            request_inputs: BTreeSet::new(),
            functions: Vec::new(),
            classes: Vec::new(),
            queries: Vec::new(),
            config_values: Vec::new(),
            external_calls: Vec::new(),
            static_calls: BTreeSet::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    UnreadableFile,
    Transcoded,
    BinaryFile,
    MalformedDeclaration,
    UnterminatedLiteral,
    Cancelled,
    EmptyCorpus,
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        static DISPLAY_STRINGS: &[(WarningKind, &str)] = &[
            (WarningKind::UnreadableFile, "unreadable file"),
            (WarningKind::Transcoded, "transcoded"),
            (WarningKind::BinaryFile, "binary file"),
            (WarningKind::MalformedDeclaration, "malformed declaration"),
            (WarningKind::UnterminatedLiteral, "unterminated literal"),
            (WarningKind::Cancelled, "cancelled"),
            (WarningKind::EmptyCorpus, "empty corpus"),
        ];

        let display_str = DISPLAY_STRINGS
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, s)| *s)
            .unwrap_or("unknown");

        write!(f, "{display_str}")
    }
}

/// A recoverable or informational problem collected during analysis.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct AnalysisWarning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub kind: WarningKind,
    pub message: String,
}

impl AnalysisWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            file: None,
            line: None,
            kind,
            message: message.into(),
        }
    }

    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Informational warnings never fail a strict run.
    pub fn is_informational(&self) -> bool {
        matches!(self.kind, WarningKind::EmptyCorpus)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ComplexitySummary {
    pub total_functions: usize,
    pub average_complexity: f64,
    pub max_complexity: u32,
    pub high_complexity_count: usize,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SecuritySummary {
    pub total: usize,
    pub by_severity: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    /// Hits per rule id, zero-hit rules included.
    pub rule_hits: BTreeMap<String, usize>,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MigrationRating {
    #[default]
    Low,
    Medium,
    High,
    VeryHigh,
}

impl std::fmt::Display for MigrationRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MigrationRating::Low => "low",
            MigrationRating::Medium => "medium",
            MigrationRating::High => "high",
            MigrationRating::VeryHigh => "very high",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct MigrationAssessment {
    pub total_files: usize,
    pub total_lines: usize,
    pub mixed_files: usize,
    pub database_functions: usize,
    pub tables: usize,
    pub include_cycles: usize,
    pub entry_points: Vec<String>,
    pub factors: Vec<String>,
    pub rating: MigrationRating,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Coupling {
    pub fan_in: usize,
    pub fan_out: usize,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CorpusSummary {
    pub complexity: ComplexitySummary,
    pub security: SecuritySummary,
    pub migration: MigrationAssessment,
    pub coupling: BTreeMap<String, Coupling>,
}

/// Aggregate root of one analysis run.
///
/// Built once by [`crate::builders::CorpusBuilder::finish`] and read-only
/// afterwards. Keyed maps iterate in path/table order so serialized output is
/// reproducible.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CorpusModel {
    pub root: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub ruleset_version: String,
    /// False when the run was cancelled before every file was analysed.
    pub complete: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_files: Vec<String>,
    pub files: BTreeMap<String, FileRecord>,
    pub tables: BTreeMap<String, TableSchema>,
    pub security_findings: Vec<SecurityFinding>,
    pub dependencies: Vec<DependencyEdge>,
    pub dependency_cycles: Vec<Vec<String>>,
    pub summary: CorpusSummary,
    pub warnings: Vec<AnalysisWarning>,
}

impl CorpusModel {
    pub fn functions(&self) -> impl Iterator<Item = (&str, &FunctionRecord)> {
        self.files
            .values()
            .flat_map(|file| file.functions.iter().map(move |f| (file.path.as_str(), f)))
    }

    /// Warnings that should fail a strict run.
    pub fn blocking_warnings(&self) -> impl Iterator<Item = &AnalysisWarning> {
        self.warnings.iter().filter(|w| !w.is_informational())
    }
}
