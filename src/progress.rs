//! Progress feedback for corpus analysis.
//!
//! Bars are drawn on stderr, only when it is a terminal and quiet mode is
//! off (`--quiet` or the `LEGACYMAP_QUIET` variable). Everywhere else a hidden
//! bar is returned, so callers never need to branch.
//!
//! ```rust,no_run
//! use legacymap::progress::{ProgressConfig, ProgressManager, TEMPLATE_FILE_ANALYSIS};
//!
//! let manager = ProgressManager::new(ProgressConfig::from_env(false));
//! let bar = manager.create_bar(120, TEMPLATE_FILE_ANALYSIS);
//! bar.set_message("Analyzing files");
//! bar.inc(1);
//! bar.finish_and_clear();
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub const QUIET_ENV: &str = "LEGACYMAP_QUIET";

pub const TEMPLATE_FILE_ANALYSIS: &str =
    "{spinner} {msg} [{bar:30}] {pos}/{len} files ({percent}%) - {eta}";
pub const TEMPLATE_SPINNER: &str = "{spinner} {msg}";

#[derive(Debug, Clone, Default)]
pub struct ProgressConfig {
    pub quiet_mode: bool,
}

impl ProgressConfig {
    pub fn from_env(quiet: bool) -> Self {
        Self {
            quiet_mode: quiet
                || std::env::var(QUIET_ENV).is_ok_and(|value| is_enabled(&value)),
        }
    }

    pub fn should_show_progress(&self) -> bool {
        if self.quiet_mode {
            return false;
        }
        use std::io::IsTerminal;
        std::io::stderr().is_terminal()
    }
}

/// Flag-style env value; the same spellings clap treats as false disable it.
fn is_enabled(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "n" | "no" | "f" | "false" | "off"
    )
}

#[derive(Debug, Clone)]
pub struct ProgressManager {
    config: ProgressConfig,
}

impl ProgressManager {
    pub fn new(config: ProgressConfig) -> Self {
        Self { config }
    }

    /// A bar of `len` steps, hidden when progress should not be shown.
    pub fn create_bar(&self, len: u64, template: &str) -> ProgressBar {
        if !self.config.should_show_progress() {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(len);
        match ProgressStyle::default_bar().template(template) {
            Ok(style) => bar.set_style(style.progress_chars("=> ")),
            Err(err) => tracing::debug!("invalid progress template: {err}"),
        }
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    }

    pub fn create_spinner(&self, msg: &str) -> ProgressBar {
        if !self.config.should_show_progress() {
            return ProgressBar::hidden();
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template(TEMPLATE_SPINNER) {
            spinner.set_style(style);
        }
        spinner.set_message(msg.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_flag_hides_bars() {
        let manager = ProgressManager::new(ProgressConfig::from_env(true));
        assert!(manager.create_bar(10, TEMPLATE_FILE_ANALYSIS).is_hidden());
        assert!(manager.create_spinner("walking").is_hidden());
    }

    #[test]
    fn test_quiet_env_values() {
        assert!(is_enabled("1"));
        assert!(is_enabled("true"));
        assert!(is_enabled("YES"));
        assert!(!is_enabled("0"));
        assert!(!is_enabled("off"));
        assert!(!is_enabled(""));
    }

    #[test]
    fn test_default_config_is_not_quiet() {
        assert!(!ProgressConfig::default().quiet_mode);
    }
}
