use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static PARAM_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@param\s+([^\s$]+)\s+&?(?:\.\.\.)?\$(\w+)").expect("valid @param regex")
});

static RETURN_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@return\s+([^\s*]+)").expect("valid @return regex"));

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocTypes {
    pub params: BTreeMap<String, String>,
    pub return_type: Option<String>,
}

/// The `/** ... */` block that ends right before `offset`, if any.
pub fn doc_block_before(text: &str, offset: usize) -> Option<&str> {
    let before = text[..offset].trim_end();
    if !before.ends_with("*/") {
        return None;
    }
    let start = before.rfind("/**")?;
    // a plain comment closing after an earlier doc block is not ours
    if before[start + 3..before.len() - 2].contains("*/") {
        return None;
    }
    Some(&before[start..])
}

pub fn parse_doc_types(doc: &str) -> DocTypes {
    DocTypes {
        params: PARAM_TAG
            .captures_iter(doc)
            .map(|caps| (caps[2].to_string(), caps[1].to_string()))
            .collect(),
        return_type: RETURN_TAG.captures(doc).map(|caps| caps[1].to_string()),
    }
}
