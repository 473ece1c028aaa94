//! Per-file analysis tasks.
//!
//! Each task reads, decodes and analyses one file without touching shared
//! state; results are folded afterwards by [`crate::builders::CorpusBuilder`].

pub mod cancel;

pub use cancel::CancellationToken;

use crate::analyzers::{Analyzer, FileAnalysis, PhpAnalyzer};
use crate::builders::CorpusBuilder;
use crate::config::LegacymapConfig;
use crate::core::{AnalysisWarning, CorpusModel, Error, Result, SourceFile, WarningKind};
use crate::io::{find_source_files, read_source};
use crate::observability::{
    increment_processed, set_current_file, set_phase, set_phase_persistent, set_progress,
    AnalysisPhase,
};
use crate::security::RuleSet;
use crate::utils::relative_key;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, debug_span};

/// Result of one file task.
#[derive(Debug, Clone)]
pub enum FileOutcome {
    Analyzed(FileAnalysis),
    /// Read or decode failure; the file contributes only a warning.
    Failed { path: String, warning: AnalysisWarning },
    /// Not started because the run was cancelled.
    Skipped(String),
}

impl FileOutcome {
    pub fn path(&self) -> &str {
        match self {
            FileOutcome::Analyzed(analysis) => analysis.path(),
            FileOutcome::Failed { path, .. } | FileOutcome::Skipped(path) => path,
        }
    }
}

/// Analyse already-decoded text. Pure apart from the crash-report context.
pub fn analyze_source(analyzer: &dyn Analyzer, source: &SourceFile) -> FileAnalysis {
    let _phase = set_phase(AnalysisPhase::FileAnalysis);
    let span = debug_span!("analyze_file", file = %source.path, analyzer = analyzer.name());
    let _enter = span.enter();
    analyzer.analyze(source)
}

/// Read `path` and analyse it. `root` only determines the file's key.
pub fn analyze_file(analyzer: &dyn Analyzer, root: &Path, path: &Path) -> FileOutcome {
    let key = relative_key(path, root);
    let _file = set_current_file(path);

    let decoded = {
        let _phase = set_phase(AnalysisPhase::Reading);
        read_source(path)
    };

    match decoded {
        Ok(decoded) => {
            let source = SourceFile::new(key, decoded.text);
            let mut analysis = analyze_source(analyzer, &source);
            if let Some(encoding) = decoded.transcoded_from {
                analysis.warnings.push(
                    AnalysisWarning::new(
                        WarningKind::Transcoded,
                        format!("decoded as {encoding}"),
                    )
                    .in_file(source.path),
                );
            }
            FileOutcome::Analyzed(analysis)
        }
        Err(err) => {
            debug!(file = %key, "file not analysed: {err}");
            let kind = match err {
                Error::Encoding { .. } => WarningKind::BinaryFile,
                _ => WarningKind::UnreadableFile,
            };
            FileOutcome::Failed {
                warning: AnalysisWarning::new(kind, err.to_string()).in_file(key.clone()),
                path: key,
            }
        }
    }
}

/// Analyse `paths` on the rayon pool. Once `token` is cancelled, files not yet
/// started come back as [`FileOutcome::Skipped`]. `on_done` runs after every
/// file task, in whatever order tasks finish.
pub fn analyze_files<F>(
    analyzer: &dyn Analyzer,
    root: &Path,
    paths: &[PathBuf],
    token: &CancellationToken,
    on_done: F,
) -> Vec<FileOutcome>
where
    F: Fn(&FileOutcome) + Sync,
{
    paths
        .par_iter()
        .map(|path| {
            if token.is_cancelled() {
                return FileOutcome::Skipped(relative_key(path, root));
            }
            let outcome = analyze_file(analyzer, root, path);
            increment_processed();
            on_done(&outcome);
            outcome
        })
        .collect()
}

/// Analyse `files` under `root` and fold the results into a corpus model.
pub fn analyze_tree<F>(
    root: &Path,
    files: &[PathBuf],
    config: &LegacymapConfig,
    rules: RuleSet,
    token: &CancellationToken,
    on_done: F,
) -> CorpusModel
where
    F: Fn(&FileOutcome) + Sync,
{
    set_phase_persistent(AnalysisPhase::FileAnalysis);
    set_progress(0, files.len());
    let analyzer = PhpAnalyzer::new(config.analysis.clone(), rules.clone());
    let outcomes = analyze_files(&analyzer, root, files, token, on_done);

    set_phase_persistent(AnalysisPhase::Aggregation);
    let mut builder = CorpusBuilder::new(root, config.analysis.clone(), rules);
    for outcome in outcomes {
        builder.add_outcome(outcome);
    }
    builder.finish()
}

/// Discover and analyse every matching file under `root`.
pub fn analyze_directory(
    root: &Path,
    config: &LegacymapConfig,
    token: &CancellationToken,
) -> Result<CorpusModel> {
    set_phase_persistent(AnalysisPhase::FileDiscovery);
    let files = find_source_files(root, &config.scan)?;
    let (rules, _) = RuleSet::with_disabled(&config.security.disabled_rules);
    Ok(analyze_tree(root, &files, config, rules, token, |_| {}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[test]
    fn test_analyze_file_uses_relative_key() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        let path = dir.path().join("lib/util.php");
        fs::write(&path, "<?php\nfunction util() { return true; }\n").unwrap();

        match analyze_file(&PhpAnalyzer::default(), dir.path(), &path) {
            FileOutcome::Analyzed(analysis) => {
                assert_eq!(analysis.path(), "lib/util.php");
                assert_eq!(analysis.record.functions[0].name, "util");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_binary_and_latin1_files() {
        let dir = TempDir::new().unwrap();
        let binary = dir.path().join("blob.php");
        fs::write(&binary, b"\x00\x01\x02").unwrap();
        let latin = dir.path().join("old.php");
        fs::write(&latin, b"<?php\n$s = 'caf\xe9';\n").unwrap();

        let analyzer = PhpAnalyzer::default();
        match analyze_file(&analyzer, dir.path(), &binary) {
            FileOutcome::Failed { warning, .. } => assert_eq!(warning.kind, WarningKind::BinaryFile),
            other => panic!("unexpected outcome: {other:?}"),
        }
        match analyze_file(&analyzer, dir.path(), &latin) {
            FileOutcome::Analyzed(analysis) => {
                assert_eq!(analysis.warnings[0].kind, WarningKind::Transcoded);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_cancelled_run_skips_everything() {
        let dir = TempDir::new().unwrap();
        let paths: Vec<PathBuf> = (0..4)
            .map(|i| {
                let path = dir.path().join(format!("f{i}.php"));
                fs::write(&path, "<?php\n").unwrap();
                path
            })
            .collect();
        let token = CancellationToken::new();
        token.cancel();
        let done = AtomicUsize::new(0);

        let outcomes = analyze_files(&PhpAnalyzer::default(), dir.path(), &paths, &token, |_| {
            done.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(outcomes.len(), 4);
        assert!(outcomes.iter().all(|o| matches!(o, FileOutcome::Skipped(_))));
        assert_eq!(done.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_analyze_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.php"), "<?php\ninclude 'lib.php';\n").unwrap();
        fs::write(dir.path().join("lib.php"), "<?php\nfunction f() {}\n").unwrap();

        let model =
            analyze_directory(dir.path(), &LegacymapConfig::default(), &CancellationToken::new())
                .unwrap();
        assert_eq!(model.files.len(), 2);
        assert!(model.complete);
        assert!(model.dependencies[0].in_corpus);
    }
}
