mod loader;

pub use loader::{directory_ancestors, load_config, load_config_from, parse_and_validate_config};

use crate::core::{Error, Result};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = ".legacymap.toml";

/// Root configuration, read from `.legacymap.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LegacymapConfig {
    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub analysis: AnalysisSettings,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Which files make up the corpus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    /// Extensions matched case-insensitively, without the dot
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Glob patterns, matched against root-relative paths
    #[serde(default)]
    pub ignore: Vec<String>,

    #[serde(default)]
    pub follow_links: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            ignore: Vec::new(),
            follow_links: false,
        }
    }
}

impl ScanConfig {
    pub fn matches_extension(&self, ext: &str) -> bool {
        self.extensions
            .iter()
            .any(|candidate| candidate.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

fn default_extensions() -> Vec<String> {
    vec!["php".into(), "inc".into(), "phtml".into()]
}

/// Limits and thresholds used by the per-file extractors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AnalysisSettings {
    /// Distinct callees kept per function
    #[serde(default = "default_max_calls")]
    pub max_calls: usize,

    /// Characters kept from a flagged line
    #[serde(default = "default_snippet_length")]
    pub snippet_length: usize,

    #[serde(default = "default_query_snippet_length")]
    pub query_snippet_length: usize,

    #[serde(default = "default_max_queries_per_file")]
    pub max_queries_per_file: usize,

    #[serde(default = "default_high_complexity_threshold")]
    pub high_complexity_threshold: u32,

    /// Equality-filter uses before a column is treated as a key
    #[serde(default = "default_primary_key_min_filters")]
    pub primary_key_min_filters: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            max_calls: default_max_calls(),
            snippet_length: default_snippet_length(),
            query_snippet_length: default_query_snippet_length(),
            max_queries_per_file: default_max_queries_per_file(),
            high_complexity_threshold: default_high_complexity_threshold(),
            primary_key_min_filters: default_primary_key_min_filters(),
        }
    }
}

fn default_max_calls() -> usize {
    20
}
fn default_snippet_length() -> usize {
    100
}
fn default_query_snippet_length() -> usize {
    200
}
fn default_max_queries_per_file() -> usize {
    100
}
fn default_high_complexity_threshold() -> u32 {
    10
}
fn default_primary_key_min_filters() -> usize {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SecurityConfig {
    /// Rule ids to skip, e.g. `RAND001`
    #[serde(default)]
    pub disabled_rules: Vec<String>,
}

impl LegacymapConfig {
    /// Rejects settings no analysis can run with.
    pub fn validate(&self) -> Result<()> {
        if self.scan.extensions.iter().all(|e| e.trim_start_matches('.').is_empty()) {
            return Err(Error::Configuration(
                "scan.extensions must name at least one extension".into(),
            ));
        }
        if self.analysis.max_calls == 0 {
            return Err(Error::Configuration("analysis.max_calls must be positive".into()));
        }
        if self.analysis.snippet_length < 4 || self.analysis.query_snippet_length < 4 {
            return Err(Error::Configuration(
                "snippet lengths must be at least 4 characters".into(),
            ));
        }
        if self.analysis.primary_key_min_filters == 0 {
            return Err(Error::Configuration(
                "analysis.primary_key_min_filters must be positive".into(),
            ));
        }
        for pattern in &self.scan.ignore {
            glob::Pattern::new(pattern)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LegacymapConfig::default();
        assert_eq!(config.scan.extensions, vec!["php", "inc", "phtml"]);
        assert_eq!(config.analysis.max_calls, 20);
        assert_eq!(config.analysis.snippet_length, 100);
        assert_eq!(config.analysis.query_snippet_length, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_extension_match_ignores_case_and_dot() {
        let scan = ScanConfig {
            extensions: vec![".PHP".into(), "inc".into()],
            ..ScanConfig::default()
        };
        assert!(scan.matches_extension("php"));
        assert!(scan.matches_extension("INC"));
        assert!(!scan.matches_extension("html"));
    }

    #[test]
    fn test_validate_rejects_bad_glob() {
        let mut config = LegacymapConfig::default();
        config.scan.ignore.push("vendor/[".into());
        assert!(matches!(config.validate(), Err(Error::Pattern(_))));
    }

    #[test]
    fn test_validate_rejects_zero_calls() {
        let mut config = LegacymapConfig::default();
        config.analysis.max_calls = 0;
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }
}
