use std::fs;
use std::path::{Path, PathBuf};

use super::{LegacymapConfig, CONFIG_FILE_NAME};
use crate::core::errors::ResultExt;
use crate::core::{Error, Result};

const MAX_TRAVERSAL_DEPTH: usize = 10;

/// Parse and validate config from a TOML string.
pub fn parse_and_validate_config(contents: &str) -> Result<LegacymapConfig> {
    let config = toml::from_str::<LegacymapConfig>(contents)?;
    config.validate()?;
    Ok(config)
}

/// `start` followed by its parents, at most `max_depth` entries.
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// Load an explicitly named config file. A missing or invalid file is an
/// error here, unlike discovery.
pub fn load_config_from(path: &Path) -> Result<LegacymapConfig> {
    let contents = fs::read_to_string(path).map_err(|e| Error::io_at(e, path))?;
    parse_and_validate_config(&contents).context(format!("loading {}", path.display()))
}

/// Find `.legacymap.toml` in `start` or its ancestors. Defaults apply when
/// none is found or the first one found does not parse.
pub fn load_config(start: &Path) -> LegacymapConfig {
    for candidate in directory_ancestors(start.to_path_buf(), MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
    {
        match fs::read_to_string(&candidate) {
            Ok(contents) => match parse_and_validate_config(&contents) {
                Ok(config) => {
                    tracing::debug!(path = %candidate.display(), "loaded config");
                    return config;
                }
                Err(e) => {
                    tracing::warn!(path = %candidate.display(), error = %e, "invalid config, using defaults");
                    return LegacymapConfig::default();
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                tracing::warn!(path = %candidate.display(), error = %e, "failed to read config file");
            }
        }
    }

    tracing::debug!(
        depth = MAX_TRAVERSAL_DEPTH,
        "no config found, using defaults"
    );
    LegacymapConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use tempfile::TempDir;

    #[test]
    fn test_parse_partial_config_keeps_defaults() {
        let config = parse_and_validate_config(indoc! {r#"
            [scan]
            ignore = ["vendor/**"]

            [security]
            disabled_rules = ["RAND001"]
        "#})
        .unwrap();
        assert_eq!(config.scan.extensions, vec!["php", "inc", "phtml"]);
        assert_eq!(config.scan.ignore, vec!["vendor/**"]);
        assert_eq!(config.security.disabled_rules, vec!["RAND001"]);
        assert_eq!(config.analysis.max_calls, 20);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = parse_and_validate_config("[scan]\nextension = [\"php\"]\n").unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
    }

    #[test]
    fn test_directory_ancestors_respects_depth() {
        let dirs: Vec<_> = directory_ancestors(PathBuf::from("/a/b/c"), 2).collect();
        assert_eq!(dirs, vec![PathBuf::from("/a/b/c"), PathBuf::from("/a/b")]);
    }

    #[test]
    fn test_discovers_config_in_parent() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "[analysis]\nmax_calls = 5\n",
        )
        .unwrap();
        let nested = tmp.path().join("app/legacy");
        fs::create_dir_all(&nested).unwrap();

        let config = load_config(&nested);
        assert_eq!(config.analysis.max_calls, 5);
    }

    #[test]
    fn test_invalid_discovered_config_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "[analysis]\nmax_calls = 0\n").unwrap();
        assert_eq!(load_config(tmp.path()), LegacymapConfig::default());
    }

    #[test]
    fn test_invalid_explicit_config_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.toml");
        fs::write(&path, "[analysis]\nmax_calls = 0\n").unwrap();
        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("max_calls"));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_config_from(&tmp.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, Error::FileSystem { .. }));
    }
}
