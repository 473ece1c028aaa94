use crate::core::{AnalysisWarning, FileRecord, SourceFile};
use crate::dependencies::DependencyEdge;
use crate::security::SecurityFinding;

pub mod php;

pub use php::PhpAnalyzer;

/// Everything one file contributes to the corpus. Built without touching
/// shared state, so files can be analysed in any order and in parallel.
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    pub record: FileRecord,
    pub findings: Vec<SecurityFinding>,
    pub edges: Vec<DependencyEdge>,
    pub warnings: Vec<AnalysisWarning>,
}

impl FileAnalysis {
    pub fn path(&self) -> &str {
        &self.record.path
    }
}

pub trait Analyzer: Send + Sync {
    fn analyze(&self, source: &SourceFile) -> FileAnalysis;
    fn name(&self) -> &'static str;
}
