//! Corpus-level summaries derived from the finished per-file results.

use crate::core::metrics::summarize_complexity;
use crate::core::{
    ComplexitySummary, FileRecord, FunctionRecord, MigrationAssessment, MigrationRating,
    SecuritySummary,
};
use crate::database::TableSchema;
use crate::security::{RuleSet, SecurityFinding};
use std::collections::BTreeMap;

/// Files scoring at least this are reported as entry points.
pub const ENTRY_POINT_THRESHOLD: f64 = 3.0;

pub fn security_summary(findings: &[SecurityFinding], rules: &RuleSet) -> SecuritySummary {
    let mut summary = SecuritySummary {
        total: findings.len(),
        rule_hits: rules
            .enabled_rules()
            .map(|rule| (rule.id.to_string(), 0))
            .collect(),
        ..SecuritySummary::default()
    };

    for finding in findings {
        *summary
            .by_severity
            .entry(finding.severity.to_string())
            .or_default() += 1;
        *summary
            .by_category
            .entry(finding.category.to_string())
            .or_default() += 1;
        *summary.rule_hits.entry(finding.rule_id.clone()).or_default() += 1;
    }

    summary
}

pub fn complexity_summary<'f>(
    files: impl IntoIterator<Item = &'f FileRecord>,
    threshold: u32,
) -> ComplexitySummary {
    let functions: Vec<&FunctionRecord> = files
        .into_iter()
        .flat_map(|file| file.functions.iter())
        .collect();
    summarize_complexity(&functions, threshold)
}

/// Counts that feed the migration rating.
struct MigrationSignals {
    total_files: usize,
    mixed_files: usize,
    queries: usize,
    ambient_state_uses: usize,
    findings: usize,
    static_calls: usize,
    singletons: usize,
    external_calls: usize,
    entry_points: usize,
    include_cycles: usize,
}

impl MigrationSignals {
    fn factors(&self) -> Vec<String> {
        let checks: [(bool, String); 9] = [
            (
                self.total_files > 0 && self.mixed_files * 2 > self.total_files,
                "Most files mix PHP and HTML; templates need extracting".into(),
            ),
            (
                self.queries > 50,
                format!("Heavy database usage ({} queries); needs careful data-access mapping", self.queries),
            ),
            (
                self.ambient_state_uses > 20,
                "Heavy global variable usage; state needs refactoring".into(),
            ),
            (
                self.entry_points > 5,
                format!("{} files are requested directly; no single front controller", self.entry_points),
            ),
            (
                self.findings > 10,
                format!("{} security findings need review during migration", self.findings),
            ),
            (
                self.static_calls > 20,
                "Heavy static method usage; needs dependency injection".into(),
            ),
            (
                self.singletons > 5,
                "Multiple singletons; needs dependency injection".into(),
            ),
            (
                self.external_calls > 10,
                "Many external API integrations; needs an HTTP client abstraction".into(),
            ),
            (
                self.include_cycles > 0,
                format!("{} include cycles", self.include_cycles),
            ),
        ];
        checks
            .into_iter()
            .filter_map(|(hit, factor)| hit.then_some(factor))
            .collect()
    }
}

pub fn rating_for(factor_count: usize) -> MigrationRating {
    match factor_count {
        0 => MigrationRating::Low,
        1..=2 => MigrationRating::Medium,
        3..=4 => MigrationRating::High,
        _ => MigrationRating::VeryHigh,
    }
}

pub fn migration_assessment(
    files: &BTreeMap<String, FileRecord>,
    tables: &BTreeMap<String, TableSchema>,
    findings: &[SecurityFinding],
    include_cycles: usize,
) -> MigrationAssessment {
    let functions = || files.values().flat_map(|f| f.functions.iter());
    let entry_points: Vec<String> = files
        .values()
        .filter(|f| f.entry_point_score >= ENTRY_POINT_THRESHOLD)
        .map(|f| f.path.clone())
        .collect();

    let signals = MigrationSignals {
        total_files: files.len(),
        mixed_files: files.values().filter(|f| f.is_mixed).count(),
        queries: files.values().map(|f| f.queries.len()).sum(),
        ambient_state_uses: functions().map(|f| f.uses_ambient_state.len()).sum(),
        findings: findings.len(),
        static_calls: files.values().map(|f| f.static_calls.len()).sum(),
        singletons: files
            .values()
            .flat_map(|f| f.classes.iter())
            .filter(|c| c.is_singleton)
            .count(),
        external_calls: files.values().map(|f| f.external_calls.len()).sum(),
        entry_points: entry_points.len(),
        include_cycles,
    };
    let factors = signals.factors();

    MigrationAssessment {
        total_files: signals.total_files,
        total_lines: files.values().map(|f| f.line_count).sum(),
        mixed_files: signals.mixed_files,
        database_functions: functions().filter(|f| f.calls_database).count(),
        tables: tables.len(),
        include_cycles,
        entry_points,
        rating: rating_for(factors.len()),
        factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::{SecurityCategory, Severity};

    fn finding(line: usize, category: SecurityCategory, severity: Severity, rule: &str) -> SecurityFinding {
        SecurityFinding {
            category,
            severity,
            file: "a.php".into(),
            line,
            snippet: String::new(),
            rule_id: rule.into(),
        }
    }

    #[test]
    fn test_security_summary_keeps_zero_hit_rules() {
        let findings = vec![
            finding(1, SecurityCategory::SqlInjection, Severity::Critical, "SQL001"),
            finding(2, SecurityCategory::SqlInjection, Severity::Critical, "SQL001"),
            finding(3, SecurityCategory::WeakHash, Severity::High, "HASH001"),
        ];
        let summary = security_summary(&findings, &RuleSet::default());
        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_severity["critical"], 2);
        assert_eq!(summary.by_category["weak_hash"], 1);
        assert_eq!(summary.rule_hits["SQL001"], 2);
        assert_eq!(summary.rule_hits["RAND001"], 0);
    }

    #[test]
    fn test_rating_scale() {
        assert_eq!(rating_for(0), MigrationRating::Low);
        assert_eq!(rating_for(2), MigrationRating::Medium);
        assert_eq!(rating_for(3), MigrationRating::High);
        assert_eq!(rating_for(7), MigrationRating::VeryHigh);
    }

    #[test]
    fn test_migration_of_small_corpus() {
        let mut index = FileRecord::empty("index.php");
        index.line_count = 40;
        index.entry_point_score = 5.0;
        index.is_mixed = true;
        let mut lib = FileRecord::empty("lib.php");
        lib.line_count = 10;
        let files: BTreeMap<_, _> = [index, lib].into_iter().map(|f| (f.path.clone(), f)).collect();

        let assessment = migration_assessment(&files, &BTreeMap::new(), &[], 1);
        assert_eq!(assessment.total_files, 2);
        assert_eq!(assessment.total_lines, 50);
        assert_eq!(assessment.entry_points, vec!["index.php"]);
        assert_eq!(assessment.factors, vec!["1 include cycles".to_string()]);
        assert_eq!(assessment.rating, MigrationRating::Medium);
    }
}
