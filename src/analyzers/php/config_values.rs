use crate::core::{ConfigSource, ConfigValue};
use crate::scanner::LexedSource;
use crate::utils::truncate_chars;
use once_cell::sync::Lazy;
use regex::Regex;

static DEFINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bdefine\s*\(\s*['"](\w+)['"]\s*,\s*(.+?)\s*\)\s*;"#).expect("valid define regex")
});

static CONFIG_ARRAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\$config\s*\[\s*['"](\w+)['"]\s*\]\s*=\s*(.+?)\s*;"#).expect("valid config regex")
});

static WELL_KNOWN_VARIABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\$(db_host|db_user|db_pass|db_password|db_name|api_key|secret_key|base_url|site_url)\s*=\s*(.+?)\s*;",
    )
    .expect("valid config variable regex")
});

const SECRET_MARKERS: &[&str] = &["pass", "pwd", "secret", "key", "token"];

const MAX_VALUE_LENGTH: usize = 100;

/// Constants and configuration assignments, with secret-looking values redacted.
pub fn extract_config_values(lexed: &LexedSource<'_>) -> Vec<ConfigValue> {
    let text = lexed.stripped();
    let sources: [(&Regex, ConfigSource); 3] = [
        (&DEFINE, ConfigSource::Define),
        (&CONFIG_ARRAY, ConfigSource::ConfigArray),
        (&WELL_KNOWN_VARIABLE, ConfigSource::Variable),
    ];

    let mut values: Vec<ConfigValue> = sources
        .iter()
        .flat_map(|(pattern, source)| {
            pattern.captures_iter(text).filter_map(move |caps| {
                let whole = caps.get(0)?;
                let name = caps[1].to_string();
                let value = if looks_secret(&name) {
                    "***".to_string()
                } else {
                    truncate_chars(&caps[2], MAX_VALUE_LENGTH)
                };
                Some(ConfigValue {
                    name,
                    value,
                    source: *source,
                    line: lexed.line_of(whole.start()),
                })
            })
        })
        .collect();

    values.sort_by_key(|v| v.line);
    values
}

fn looks_secret(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SECRET_MARKERS.iter().any(|marker| lower.contains(marker))
}
