//! Shared error types for the library

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors of a legacymap run.
///
/// Per-file problems are not errors; they are collected as
/// [`crate::core::AnalysisWarning`]s on the corpus model.
#[derive(Debug, Error)]
pub enum Error {
    /// File system related errors
    #[error("File system error: {message}")]
    FileSystem {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    /// The extension filter matched nothing under the root
    #[error("No source files matched under {}", root.display())]
    NoFilesMatched { root: PathBuf },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Undecodable file contents
    #[error("Encoding error in {}: {message}", path.display())]
    Encoding { path: PathBuf, message: String },

    /// Generic errors with context
    #[error("{context}: {message}")]
    WithContext { context: String, message: String },

    /// IO errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML errors
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    /// Pattern errors
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
}

impl Error {
    /// Create a file system error with path context
    pub fn file_system(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::FileSystem {
            message: message.into(),
            path: Some(path.into()),
            source: None,
        }
    }

    /// Create a file system error that keeps the underlying io error
    pub fn io_at(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::FileSystem {
            message: format!("cannot access {}", path.display()),
            path: Some(path),
            source: Some(source),
        }
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            message: self.to_string(),
        }
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_files_matched_message_names_root() {
        let err = Error::NoFilesMatched {
            root: PathBuf::from("/srv/app"),
        };
        assert_eq!(err.to_string(), "No source files matched under /srv/app");
    }

    #[test]
    fn test_context_wraps_message() {
        let result: Result<()> = Err(Error::Configuration("bad key".into()));
        let err = result.context("loading .legacymap.toml").unwrap_err();
        assert_eq!(
            err.to_string(),
            "loading .legacymap.toml: Configuration error: bad key"
        );
    }

    #[test]
    fn test_io_at_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = Error::io_at(io, "/nope");
        match err {
            Error::FileSystem { path, source, .. } => {
                assert_eq!(path, Some(PathBuf::from("/nope")));
                assert!(source.is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_io_at_reports_path_and_cause_once() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = Error::io_at(io, "/srv/app/config.php");
        assert_eq!(
            err.to_string(),
            "File system error: cannot access /srv/app/config.php"
        );

        let chain = format!("{:#}", anyhow::Error::from(err));
        assert_eq!(chain.matches("missing").count(), 1);
        assert_eq!(chain.matches("/srv/app/config.php").count(), 1);
    }
}
