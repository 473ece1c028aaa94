use anyhow::Result;
use clap::Parser;
use legacymap::cli::{Cli, Commands};
use legacymap::commands::{handle_analyze, init_config, AnalyzeConfig};
use std::process::ExitCode;

/// Exit status when `--strict` is set and warnings were recorded.
const STRICT_FAILURE: u8 = 2;

fn main() -> ExitCode {
    legacymap::observability::install_panic_hook();
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Analyze {
            path,
            format,
            output,
            config,
            extensions,
            ignore,
            jobs,
            strict,
            quiet,
            verbosity,
        } => {
            legacymap::logging::init_logging(verbosity);
            let report = handle_analyze(AnalyzeConfig {
                path,
                format: format.into(),
                output,
                config,
                extensions,
                ignore,
                jobs,
                quiet,
            })?;

            if strict && report.blocking_warnings > 0 {
                eprintln!(
                    "legacymap: --strict: {} warning(s) recorded",
                    report.blocking_warnings
                );
                return Ok(ExitCode::from(STRICT_FAILURE));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Init { path, force } => {
            legacymap::logging::init_logging(0);
            let written = init_config(&path, force)?;
            println!("Created {}", written.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}
