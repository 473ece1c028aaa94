pub mod rules;
pub mod types;

pub use rules::{Rule, RuleSet, RULES, RULESET_VERSION};
pub use types::{SecurityCategory, SecurityFinding, Severity};

use crate::scanner::LexedSource;
use crate::utils::truncate_chars;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Scans every line of a file against the enabled rules.
///
/// At most one finding per (line, category) survives; the higher severity
/// wins and an equal severity keeps the earlier rule.
pub fn analyze_security_patterns(
    lexed: &LexedSource<'_>,
    path: &str,
    rules: &RuleSet,
    snippet_length: usize,
) -> Vec<SecurityFinding> {
    let stripped = lexed.stripped();
    let mut kept: BTreeMap<(usize, SecurityCategory), SecurityFinding> = BTreeMap::new();

    for line in 1..=lexed.line_count() {
        let text = &stripped[lexed.line_range(line)];
        if text.trim().is_empty() {
            continue;
        }
        for rule in rules.matching(text) {
            let finding = SecurityFinding {
                category: rule.category,
                severity: rule.severity,
                file: path.to_string(),
                line,
                snippet: truncate_chars(text, snippet_length),
                rule_id: rule.id.to_string(),
            };
            match kept.entry((line, rule.category)) {
                Entry::Vacant(slot) => {
                    slot.insert(finding);
                }
                Entry::Occupied(mut slot) if finding.severity > slot.get().severity => {
                    slot.insert(finding);
                }
                Entry::Occupied(_) => {}
            }
        }
    }

    kept.into_values().collect()
}

/// Collapses findings sharing (file, line, category), keeping the most
/// severe. Used when findings from several sources are merged.
pub fn dedup_findings(findings: Vec<SecurityFinding>) -> Vec<SecurityFinding> {
    let mut kept: BTreeMap<(String, usize, SecurityCategory), SecurityFinding> = BTreeMap::new();
    for finding in findings {
        let key = (finding.file.clone(), finding.line, finding.category);
        match kept.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(finding);
            }
            Entry::Occupied(mut slot) => {
                let current = slot.get();
                if (finding.severity, std::cmp::Reverse(&finding.rule_id))
                    > (current.severity, std::cmp::Reverse(&current.rule_id))
                {
                    slot.insert(finding);
                }
            }
        }
    }
    kept.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::lex;
    use indoc::indoc;

    fn scan(src: &str) -> Vec<SecurityFinding> {
        analyze_security_patterns(&lex(src), "app.php", &RuleSet::default(), 100)
    }

    #[test]
    fn test_concatenated_query_is_one_critical_finding() {
        let findings = scan("<?php\n$q = \"SELECT * FROM t WHERE id = \" + userInput;\n");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, SecurityCategory::SqlInjection);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].line, 2);
        assert_eq!(findings[0].rule_id, "SQL001");
    }

    #[test]
    fn test_repeated_pattern_on_one_line_dedups() {
        let findings = scan("<?php\neval($a); eval($b);\n");
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_different_categories_on_one_line_stay_distinct() {
        let findings = scan("<?php\necho $_GET['q']; $h = md5($password);\n");
        let categories: Vec<_> = findings.iter().map(|f| f.category).collect();
        assert_eq!(
            categories,
            vec![SecurityCategory::UnescapedOutput, SecurityCategory::WeakHash]
        );
        let hash = &findings[1];
        assert_eq!(hash.severity, Severity::High);
        assert_eq!(hash.rule_id, "HASH001");
    }

    #[test]
    fn test_commented_code_is_ignored() {
        let src = indoc! {r#"
            <?php
            // eval($code);
            /* system($cmd); */
            $x = 1; # exec($y);
        "#};
        assert!(scan(src).is_empty());
    }

    #[test]
    fn test_snippet_is_bounded() {
        let long = format!("<?php\neval(${});\n", "a".repeat(500));
        let findings = scan(&long);
        assert!(findings[0].snippet.chars().count() <= 100);
    }

    #[test]
    fn test_dedup_findings_keeps_highest_severity() {
        let base = SecurityFinding {
            category: SecurityCategory::WeakHash,
            severity: Severity::Low,
            file: "a.php".into(),
            line: 3,
            snippet: "md5($p)".into(),
            rule_id: "HASH003".into(),
        };
        let high = SecurityFinding {
            severity: Severity::High,
            rule_id: "HASH001".into(),
            ..base.clone()
        };
        let merged = dedup_findings(vec![base.clone(), high.clone(), base]);
        assert_eq!(merged, vec![high]);
    }
}
