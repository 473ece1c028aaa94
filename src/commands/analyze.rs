use crate::config::{self, LegacymapConfig};
use crate::core::CorpusModel;
use crate::io::{self, create_writer, OutputFormat};
use crate::observability::{set_phase_persistent, AnalysisPhase};
use crate::pipeline::{analyze_tree, CancellationToken};
use crate::progress::{ProgressConfig, ProgressManager, TEMPLATE_FILE_ANALYSIS};
use crate::security::RuleSet;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub struct AnalyzeConfig {
    pub path: PathBuf,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub extensions: Vec<String>,
    pub ignore: Vec<String>,
    pub jobs: usize,
    pub quiet: bool,
}

/// What the caller needs to choose an exit status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeReport {
    pub files: usize,
    pub warnings: usize,
    pub blocking_warnings: usize,
    pub complete: bool,
}

pub fn handle_analyze(config: AnalyzeConfig) -> Result<AnalyzeReport> {
    set_phase_persistent(AnalysisPhase::FileDiscovery);
    let settings = resolve_config(&config)?;
    let (rules, unknown) = RuleSet::with_disabled(&settings.security.disabled_rules);
    for id in unknown {
        warn!("unknown rule id in security.disabled_rules: {id}");
    }

    configure_thread_pool(config.jobs);

    let files = io::find_source_files(&config.path, &settings.scan)
        .with_context(|| format!("cannot analyze {}", config.path.display()))?;
    info!(root = %config.path.display(), files = files.len(), "discovered source files");

    let corpus = analyze_corpus(&config, &settings, rules, &files);

    set_phase_persistent(AnalysisPhase::OutputGeneration);
    write_output(&corpus, &config, settings.analysis.high_complexity_threshold)?;

    let report = AnalyzeReport {
        files: corpus.files.len(),
        warnings: corpus.warnings.len(),
        blocking_warnings: corpus.blocking_warnings().count(),
        complete: corpus.complete,
    };
    eprint!("{}", issue_summary(&corpus));
    Ok(report)
}

/// Explicit `--config` must parse; a discovered file falls back to defaults.
fn resolve_config(config: &AnalyzeConfig) -> Result<LegacymapConfig> {
    let mut settings = match &config.config {
        Some(path) => config::load_config_from(path)
            .with_context(|| format!("invalid configuration file {}", path.display()))?,
        None => config::load_config(&config.path),
    };

    if !config.extensions.is_empty() {
        settings.scan.extensions = config.extensions.clone();
    }
    settings.scan.ignore.extend(config.ignore.iter().cloned());
    settings
        .validate()
        .context("invalid settings after applying command-line overrides")?;
    Ok(settings)
}

fn configure_thread_pool(jobs: usize) {
    if jobs == 0 {
        return;
    }
    if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(jobs).build_global() {
        debug!("thread pool already configured: {e}");
    }
}

fn analyze_corpus(
    config: &AnalyzeConfig,
    settings: &LegacymapConfig,
    rules: RuleSet,
    files: &[PathBuf],
) -> CorpusModel {
    let token = CancellationToken::new();
    if let Err(e) = token.cancel_on_interrupt() {
        debug!("interrupt handler not installed: {e}");
    }

    let progress = ProgressManager::new(ProgressConfig::from_env(config.quiet));
    let bar = progress.create_bar(files.len() as u64, TEMPLATE_FILE_ANALYSIS);
    bar.set_message("Analyzing files");
    let corpus = analyze_tree(&config.path, files, settings, rules, &token, |_| bar.inc(1));
    bar.finish_and_clear();
    corpus
}

fn is_stdout(output: Option<&Path>) -> bool {
    output.is_none_or(|path| path.as_os_str() == "-")
}

fn write_output(corpus: &CorpusModel, config: &AnalyzeConfig, threshold: u32) -> Result<()> {
    let to_stdout = is_stdout(config.output.as_deref());
    if config.format == OutputFormat::Terminal && !(to_stdout && std::io::stdout().is_terminal()) {
        colored::control::set_override(false);
    }

    let out: Box<dyn Write> = match config.output.as_deref() {
        Some(path) if !to_stdout => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("cannot create {}", parent.display()))?;
            }
            let file = File::create(path)
                .with_context(|| format!("cannot write {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        _ => Box::new(std::io::stdout().lock()),
    };

    create_writer(config.format, out, threshold)
        .write_corpus(corpus)
        .context("failed to write output")?;

    if let Some(path) = config.output.as_deref().filter(|_| !to_stdout) {
        info!(output = %path.display(), "wrote corpus model");
    }
    Ok(())
}

/// Recoverable issues for stderr, so partial output stays usable. Printed
/// regardless of `--quiet`.
fn issue_summary(corpus: &CorpusModel) -> String {
    let mut summary = String::new();
    let blocking = corpus.blocking_warnings().count();
    if !corpus.complete {
        summary.push_str(&format!(
            "legacymap: run incomplete, {} of {} files not analysed\n",
            corpus.skipped_files.len(),
            corpus.skipped_files.len() + corpus.files.len()
        ));
    }
    if blocking > 0 {
        summary.push_str(&format!(
            "legacymap: {blocking} recoverable issue(s) recorded; see `warnings` in the output\n"
        ));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdout_detection() {
        assert!(is_stdout(None));
        assert!(is_stdout(Some(Path::new("-"))));
        assert!(!is_stdout(Some(Path::new("out.json"))));
    }

    #[test]
    fn test_cli_overrides_replace_extensions_and_extend_ignores() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(".legacymap.toml"),
            "[scan]\nignore = [\"vendor/**\"]\n",
        )
        .unwrap();
        let config = AnalyzeConfig {
            path: dir.path().to_path_buf(),
            format: OutputFormat::Json,
            output: None,
            config: None,
            extensions: vec!["module".into()],
            ignore: vec!["cache/**".into()],
            jobs: 0,
            quiet: true,
        };

        let settings = resolve_config(&config).unwrap();
        assert_eq!(settings.scan.extensions, vec!["module"]);
        assert_eq!(settings.scan.ignore, vec!["vendor/**", "cache/**"]);
    }

    #[test]
    fn test_invalid_explicit_config_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("custom.toml");
        std::fs::write(&file, "[analysis]\nmax_calls = \"lots\"\n").unwrap();
        let config = AnalyzeConfig {
            path: dir.path().to_path_buf(),
            format: OutputFormat::Json,
            output: None,
            config: Some(file),
            extensions: vec![],
            ignore: vec![],
            jobs: 0,
            quiet: true,
        };
        assert!(resolve_config(&config).is_err());
    }
}
