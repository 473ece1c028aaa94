//! Structural analysis of legacy PHP codebases.
//!
//! The pipeline recovers structure from raw text without a PHP parser:
//! declarations and their complexity, inferred return shapes, SQL tables and
//! columns, security findings and the include graph. Every file is analysed
//! independently; [`builders::CorpusBuilder`] folds the results into one
//! [`CorpusModel`].
//!
//! ```rust,no_run
//! use legacymap::config::LegacymapConfig;
//! use legacymap::pipeline::{analyze_directory, CancellationToken};
//!
//! let model = analyze_directory(
//!     std::path::Path::new("legacy-app"),
//!     &LegacymapConfig::default(),
//!     &CancellationToken::new(),
//! )?;
//! for (name, table) in &model.tables {
//!     println!("{name}: {:?}", table.columns);
//! }
//! # Ok::<(), legacymap::Error>(())
//! ```

pub mod analyzers;
pub mod builders;
pub mod cli;
pub mod commands;
pub mod complexity;
pub mod config;
pub mod core;
pub mod database;
pub mod dependencies;
pub mod io;
pub mod logging;
pub mod observability;
pub mod pipeline;
pub mod progress;
pub mod scanner;
pub mod security;
pub mod utils;

pub use crate::core::{
    AnalysisWarning, ClassRecord, CorpusModel, Error, FileRecord, FunctionRecord, RequestInput,
    Result, ReturnType, SourceFile, WarningKind,
};

pub use crate::core::metrics::{
    calculate_average_complexity, count_high_complexity, find_max_complexity,
};

pub use crate::analyzers::{Analyzer, FileAnalysis, PhpAnalyzer};
pub use crate::builders::CorpusBuilder;
pub use crate::database::{QueryRecord, StatementKind, TableSchema};
pub use crate::dependencies::{DependencyEdge, DependencyGraph, IncludeTarget};
pub use crate::io::output::{create_writer, OutputFormat, OutputWriter};
pub use crate::pipeline::{analyze_directory, analyze_source, CancellationToken};
pub use crate::security::{SecurityCategory, SecurityFinding, Severity};
