use crate::core::Parameter;
use crate::scanner::LexedSource;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static PARAM_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(&)?\s*(\.\.\.)?\s*\$([A-Za-z_]\w*)").expect("valid parameter regex")
});

static SIMPLE_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:-?\d+(?:\.\d+)?|'[^']*'|"[^"]*"|(?i:true|false|null)|\[\s*\]|(?i:array)\s*\(\s*\))$"#)
        .expect("valid literal regex")
});

const PROMOTION_MODIFIERS: &[&str] = &["public", "private", "protected", "readonly"];

/// Parameters of the list spanning `range` (inside the parentheses).
pub fn parse_parameters(lexed: &LexedSource<'_>, range: Range<usize>) -> Vec<Parameter> {
    let code = &lexed.code().as_bytes()[range.clone()];
    let stripped = &lexed.stripped()[range.clone()];

    split_top_level(code, b',')
        .into_iter()
        .filter_map(|segment| parse_parameter(&stripped[segment.clone()], &code[segment]))
        .collect()
}

fn parse_parameter(text: &str, code: &[u8]) -> Option<Parameter> {
    let (declaration, default) = match default_separator(code) {
        Some(eq) => (&text[..eq], Some(text[eq + 1..].trim())),
        None => (text, None),
    };

    let caps = PARAM_NAME.captures(declaration)?;
    let whole = caps.get(0)?;
    let type_hint = declaration[..whole.start()]
        .split_whitespace()
        .filter(|word| !PROMOTION_MODIFIERS.contains(&word.to_ascii_lowercase().as_str()))
        .filter(|word| !word.starts_with("#["))
        .collect::<Vec<_>>()
        .join(" ");

    Some(Parameter {
        name: caps[3].to_string(),
        type_hint: (!type_hint.is_empty()).then_some(type_hint),
        default: default
            .filter(|value| SIMPLE_LITERAL.is_match(value))
            .map(str::to_string),
        by_reference: caps.get(1).is_some(),
        variadic: caps.get(2).is_some(),
    })
}

/// Non-blank ranges separated by `sep` at bracket depth zero.
fn split_top_level(code: &[u8], sep: u8) -> Vec<Range<usize>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, &b) in code.iter().enumerate() {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            _ if b == sep && depth == 0 => {
                parts.push(start..i);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(start..code.len());
    parts.retain(|r| !code[r.clone()].iter().all(u8::is_ascii_whitespace));
    parts
}

/// Offset of the `=` introducing a default value.
fn default_separator(code: &[u8]) -> Option<usize> {
    let mut depth = 0usize;
    for (i, &b) in code.iter().enumerate() {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b'=' if depth == 0 && !matches!(code.get(i + 1), Some(b'=' | b'>')) => {
                return Some(i)
            }
            _ => {}
        }
    }
    None
}
