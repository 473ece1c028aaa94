//! End-to-end behaviour of the analysis pipeline on small PHP sources and on
//! the `legacy_app` fixture corpus.

use indoc::indoc;
use legacymap::config::LegacymapConfig;
use legacymap::security::RuleSet;
use legacymap::{
    analyze_directory, analyze_source, CancellationToken, CorpusBuilder, FileAnalysis,
    IncludeTarget, PhpAnalyzer, ReturnType, SecurityCategory, Severity, SourceFile, WarningKind,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::path::PathBuf;

fn analyze(path: &str, src: &str) -> FileAnalysis {
    analyze_source(&PhpAnalyzer::default(), &SourceFile::new(path, src))
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn fixture_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/fixtures/legacy_app")
}

#[test]
fn test_carrier_variable_keys_become_return_keys() {
    let analysis = analyze(
        "user.php",
        indoc! {r#"
            <?php
            function build_user() {
                $result['id'] = 5; $result['name'] = 'x'; return $result;
            }
        "#},
    );
    let function = &analysis.record.functions[0];
    assert_eq!(function.return_type, ReturnType::Array);
    assert_eq!(function.return_keys, set(&["id", "name"]));
}

#[test]
fn test_nested_assignment_becomes_nested_keys() {
    let analysis = analyze(
        "price.php",
        indoc! {r#"
            <?php
            function price_info() {
                $result['data']['price'] = 10;
                return $result;
            }
        "#},
    );
    let function = &analysis.record.functions[0];
    assert_eq!(function.return_nested_keys["data"], set(&["price"]));
}

#[test]
fn test_query_literal_feeds_table_schema() {
    let analysis = analyze(
        "active.php",
        "<?php\n$rows = mysql_query(\"SELECT name FROM users WHERE status = 'active'\");\n",
    );
    let mut builder = CorpusBuilder::new(".", Default::default(), RuleSet::default());
    builder.add(analysis);
    let model = builder.finish();

    let users = &model.tables["users"];
    assert!(users.columns.is_superset(&set(&["name", "status"])));
}

#[test]
fn test_concatenated_query_is_one_critical_finding() {
    let analysis = analyze(
        "search.php",
        "<?php\n$sql = \"SELECT * FROM t WHERE id = \" . $userInput;\n",
    );
    let injections: Vec<_> = analysis
        .findings
        .iter()
        .filter(|f| f.category == SecurityCategory::SqlInjection)
        .collect();
    assert_eq!(injections.len(), 1);
    assert_eq!(injections[0].severity, Severity::Critical);
    assert_eq!(injections[0].line, 2);
}

#[test]
fn test_unbalanced_declaration_is_flagged_not_fatal() {
    let analysis = analyze(
        "broken.php",
        "<?php\nfunction half_done($x) {\n    if ($x) {\n        return 1;\n",
    );
    assert_eq!(analysis.record.functions.len(), 1);
    assert!(analysis.record.functions[0].malformed);
    assert!(analysis
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::MalformedDeclaration));
}

#[test]
fn test_findings_deduplicate_per_line_and_category() {
    // Matches several injection rules on the same line.
    let analysis = analyze(
        "dup.php",
        "<?php\nmysql_query(\"SELECT * FROM t WHERE id = $id AND x = \" . $_GET['x']);\n",
    );
    let keys: Vec<_> = analysis.findings.iter().map(|f| f.key()).collect();
    let unique: BTreeSet<_> = keys.iter().cloned().collect();
    assert_eq!(keys.len(), unique.len());
    assert!(analysis
        .findings
        .iter()
        .any(|f| f.category == SecurityCategory::SqlInjection));
}

#[test]
fn test_fixture_corpus() {
    let model = analyze_directory(
        &fixture_root(),
        &LegacymapConfig::default(),
        &CancellationToken::new(),
    )
    .unwrap();

    let paths: Vec<&str> = model.files.keys().map(String::as_str).collect();
    assert_eq!(
        paths,
        vec![
            "admin/report.php",
            "index.php",
            "lib/db.php",
            "lib/helpers.inc",
            "templates/header.phtml",
        ]
    );
    assert!(model.complete);

    let users = &model.tables["users"];
    assert_eq!(users.columns, set(&["email", "id", "name", "status"]));
    assert!(model.tables.contains_key("orders"));

    let find_user = model
        .functions()
        .find(|(_, f)| f.name == "find_user")
        .map(|(_, f)| f)
        .unwrap();
    assert!(find_user.calls_database);
    assert_eq!(find_user.return_keys, set(&["contact", "id", "name"]));
    assert_eq!(find_user.return_nested_keys["contact"], set(&["email"]));

    let helpers = &model.files["lib/helpers.inc"];
    assert!(helpers.classes[0].is_singleton);

    assert!(model
        .dependencies
        .iter()
        .any(|e| e.source_file == "admin/report.php"
            && e.target == IncludeTarget::Resolved("lib/db.php".into())
            && e.in_corpus));
    assert!(model
        .dependencies
        .iter()
        .any(|e| e.source_file == "index.php" && e.target.resolved().is_none()));
    assert!(model.dependency_cycles.is_empty());

    assert!(model
        .security_findings
        .iter()
        .any(|f| f.file == "admin/report.php" && f.category == SecurityCategory::SqlInjection));
    assert!(model
        .security_findings
        .iter()
        .any(|f| f.file == "templates/header.phtml"
            && f.category == SecurityCategory::UnescapedOutput));
}

#[test]
fn test_fixture_corpus_is_reproducible() {
    let config = LegacymapConfig::default();
    let first = analyze_directory(&fixture_root(), &config, &CancellationToken::new()).unwrap();
    let second = analyze_directory(&fixture_root(), &config, &CancellationToken::new()).unwrap();

    assert_eq!(first.files, second.files);
    assert_eq!(first.tables, second.tables);
    assert_eq!(first.security_findings, second.security_findings);
    assert_eq!(first.dependencies, second.dependencies);
    assert_eq!(first.warnings, second.warnings);
}
