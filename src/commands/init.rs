use crate::config::{LegacymapConfig, CONFIG_FILE_NAME};
use crate::io;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const HEADER: &str = "# legacymap configuration\n# Every key is optional; removed keys fall back to these defaults.\n\n";

/// Write a default configuration file into `dir`, returning its path.
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        );
    }

    let body = toml::to_string_pretty(&LegacymapConfig::default())
        .context("failed to render default configuration")?;
    io::write_file(&config_path, &format!("{HEADER}{body}"))?;
    Ok(config_path)
}
