use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "legacymap")]
#[command(about = "Structural analyzer for legacy PHP codebases", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a source tree and write the corpus model
    Analyze {
        /// Root directory to analyze
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Output file; `-` or absent writes to stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration file (defaults to `.legacymap.toml` discovered from the root upwards)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// File extensions to include, replacing the configured list (repeatable)
        #[arg(long = "ext")]
        extensions: Vec<String>,

        /// Glob patterns to skip, added to the configured list (repeatable)
        #[arg(long = "ignore")]
        ignore: Vec<String>,

        /// Number of worker threads (0 = all cores)
        #[arg(short = 'j', long, default_value = "0")]
        jobs: usize,

        /// Exit with status 2 when any warning was recorded
        #[arg(long)]
        strict: bool,

        /// Suppress progress output
        #[arg(
            short,
            long,
            env = "LEGACYMAP_QUIET",
            action = clap::ArgAction::SetTrue,
            value_parser = clap::builder::FalseyValueParser::new()
        )]
        quiet: bool,

        /// Increase log verbosity (-v, -vv, -vvv)
        #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
        verbosity: u8,
    },

    /// Write a default `.legacymap.toml`
    Init {
        /// Directory to write the file into
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed corpus model
    Json,
    /// Markdown report
    Markdown,
    /// Colored terminal summary
    #[value(alias = "human")]
    Terminal,
}

impl From<OutputFormat> for crate::io::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => crate::io::OutputFormat::Json,
            OutputFormat::Markdown => crate::io::OutputFormat::Markdown,
            OutputFormat::Terminal => crate::io::OutputFormat::Terminal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_analyze_arguments() {
        let cli = Cli::parse_from([
            "legacymap", "analyze", "app", "--format", "human", "-o", "-", "--ext", "php",
            "--ext", "inc", "--strict", "-vv",
        ]);
        match cli.command {
            Commands::Analyze {
                path,
                format,
                output,
                extensions,
                strict,
                verbosity,
                ..
            } => {
                assert_eq!(path, PathBuf::from("app"));
                assert_eq!(format, OutputFormat::Terminal);
                assert_eq!(output, Some(PathBuf::from("-")));
                assert_eq!(extensions, vec!["php", "inc"]);
                assert!(strict);
                assert_eq!(verbosity, 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
