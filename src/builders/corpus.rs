//! Order-independent reduction of per-file results into a [`CorpusModel`].
//!
//! The builder keeps each file's result keyed by path, so adding files in any
//! order, or adding the same file twice, produces the same model. Table
//! schemas are folded from per-file partials at [`CorpusBuilder::finish`] and
//! column roles are derived only after the fold.

use super::summary::{complexity_summary, migration_assessment, security_summary};
use crate::analyzers::FileAnalysis;
use crate::config::AnalysisSettings;
use crate::core::{AnalysisWarning, CorpusModel, CorpusSummary, WarningKind};
use crate::database::{merge_schemas, schemas_from_queries, TableSchema};
use crate::dependencies::build_dependency_graph;
use crate::pipeline::FileOutcome;
use crate::security::{dedup_findings, RuleSet, RULESET_VERSION};
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug)]
struct FileEntry {
    analysis: FileAnalysis,
    schemas: BTreeMap<String, TableSchema>,
}

#[derive(Debug)]
pub struct CorpusBuilder {
    root: PathBuf,
    settings: AnalysisSettings,
    rules: RuleSet,
    files: BTreeMap<String, FileEntry>,
    failed: BTreeMap<String, AnalysisWarning>,
    skipped: BTreeSet<String>,
    warnings: Vec<AnalysisWarning>,
}

impl CorpusBuilder {
    pub fn new(root: impl Into<PathBuf>, settings: AnalysisSettings, rules: RuleSet) -> Self {
        Self {
            root: root.into(),
            settings,
            rules,
            files: BTreeMap::new(),
            failed: BTreeMap::new(),
            skipped: BTreeSet::new(),
            warnings: Vec::new(),
        }
    }

    /// Add or replace the result for one file.
    pub fn add(&mut self, analysis: FileAnalysis) -> &mut Self {
        let path = analysis.path().to_string();
        let schemas = schemas_from_queries(&analysis.record.queries);
        self.failed.remove(&path);
        self.skipped.remove(&path);
        self.files.insert(path, FileEntry { analysis, schemas });
        self
    }

    pub fn add_outcome(&mut self, outcome: FileOutcome) -> &mut Self {
        match outcome {
            FileOutcome::Analyzed(analysis) => {
                self.add(analysis);
            }
            FileOutcome::Failed { path, warning } => {
                self.files.remove(&path);
                self.failed.insert(path, warning);
            }
            FileOutcome::Skipped(path) => {
                if !self.files.contains_key(&path) {
                    self.skipped.insert(path);
                }
            }
        }
        self
    }

    /// A run-level warning not tied to one file's result.
    pub fn add_warning(&mut self, warning: AnalysisWarning) -> &mut Self {
        self.warnings.push(warning);
        self
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn finish(self) -> CorpusModel {
        let CorpusBuilder {
            root,
            settings,
            rules,
            files,
            failed,
            skipped,
            mut warnings,
        } = self;

        let mut tables: BTreeMap<String, TableSchema> = BTreeMap::new();
        let mut findings = Vec::new();
        let mut edges = Vec::new();
        let mut records = BTreeMap::new();

        for (path, entry) in files {
            merge_schemas(&mut tables, &entry.schemas);
            let FileAnalysis {
                record,
                findings: file_findings,
                edges: file_edges,
                warnings: file_warnings,
            } = entry.analysis;
            findings.extend(file_findings);
            edges.extend(file_edges);
            warnings.extend(file_warnings);
            records.insert(path, record);
        }
        for schema in tables.values_mut() {
            schema.assign_roles(settings.primary_key_min_filters);
        }

        let findings = dedup_findings(findings);

        for edge in &mut edges {
            edge.in_corpus = edge
                .target
                .resolved()
                .is_some_and(|target| records.contains_key(target));
        }
        edges.sort();

        let graph = build_dependency_graph(records.keys().map(String::as_str), &edges);
        let dependency_cycles = graph.detect_cycles();

        warnings.extend(failed.into_values());
        if !skipped.is_empty() {
            warnings.push(AnalysisWarning::new(
                WarningKind::Cancelled,
                format!("run cancelled; {} files not analysed", skipped.len()),
            ));
        }
        if records.is_empty() {
            warnings.push(AnalysisWarning::new(
                WarningKind::EmptyCorpus,
                "no files were analysed",
            ));
        }
        warnings.sort();
        warnings.dedup();

        let summary = CorpusSummary {
            complexity: complexity_summary(records.values(), settings.high_complexity_threshold),
            security: security_summary(&findings, &rules),
            migration: migration_assessment(&records, &tables, &findings, dependency_cycles.len()),
            coupling: graph.coupling(),
        };

        debug!(
            edges = graph.dependency_count(),
            cycles = dependency_cycles.len(),
            "dependency graph built"
        );
        info!(
            files = records.len(),
            tables = tables.len(),
            findings = findings.len(),
            warnings = warnings.len(),
            "corpus model complete"
        );

        CorpusModel {
            root,
            generated_at: Utc::now(),
            ruleset_version: RULESET_VERSION.to_string(),
            complete: skipped.is_empty(),
            skipped_files: skipped.into_iter().collect(),
            files: records,
            tables,
            security_findings: findings,
            dependencies: edges,
            dependency_cycles,
            summary,
            warnings,
        }
    }
}
