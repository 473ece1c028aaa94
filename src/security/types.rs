use serde::{Deserialize, Serialize};

/// Closed vulnerability taxonomy of the rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityCategory {
    /// Query text assembled by concatenation or interpolation
    SqlInjection,
    UnescapedOutput,
    /// eval, shell execution, unserialize of input
    DangerousExecution,
    /// File paths built from request input
    PathTraversal,
    WeakHash,
    InsecureRandom,
    /// extract/parse_str/variable variables fed by input
    VariableInjection,
}

impl std::fmt::Display for SecurityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SqlInjection => "sql_injection",
            Self::UnescapedOutput => "unescaped_output",
            Self::DangerousExecution => "dangerous_execution",
            Self::PathTraversal => "path_traversal",
            Self::WeakHash => "weak_hash",
            Self::InsecureRandom => "insecure_random",
            Self::VariableInjection => "variable_injection",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

/// One rule match, at most one per (file, line, category).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityFinding {
    pub category: SecurityCategory,
    pub severity: Severity,
    pub file: String,
    /// 1-indexed
    pub line: usize,
    pub snippet: String,
    pub rule_id: String,
}

impl SecurityFinding {
    /// Deduplication key.
    pub fn key(&self) -> (&str, usize, SecurityCategory) {
        (self.file.as_str(), self.line, self.category)
    }
}
