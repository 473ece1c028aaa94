use crate::core::RequestInput;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static SUPERGLOBAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(_GET|_POST|_REQUEST|_SESSION|_COOKIE|_FILES|_SERVER|_ENV|HTTP_GET_VARS|HTTP_POST_VARS|HTTP_COOKIE_VARS|HTTP_SESSION_VARS|HTTP_POST_FILES|HTTP_SERVER_VARS|HTTP_ENV_VARS)\b")
        .expect("valid superglobal regex")
});

static FILTER_INPUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bfilter_input(?:_array)?\s*\(\s*INPUT_(GET|POST|COOKIE|SERVER|ENV|REQUEST|SESSION)\b")
        .expect("valid filter_input regex")
});

static RAW_BODY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)php://input").expect("valid raw body regex"));

static HEADER_READ: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:getallheaders|apache_request_headers)\s*\(").expect("valid header regex")
});

fn categories(source: &str) -> &'static [RequestInput] {
    match source.to_ascii_uppercase().trim_start_matches('_') {
        "GET" | "HTTP_GET_VARS" => &[RequestInput::Query],
        "POST" | "HTTP_POST_VARS" => &[RequestInput::Body],
        "REQUEST" => &[RequestInput::Query, RequestInput::Body],
        "SESSION" | "HTTP_SESSION_VARS" => &[RequestInput::Session],
        "COOKIE" | "HTTP_COOKIE_VARS" => &[RequestInput::Cookie],
        "FILES" | "HTTP_POST_FILES" => &[RequestInput::Upload],
        "SERVER" | "ENV" | "HTTP_SERVER_VARS" | "HTTP_ENV_VARS" => &[RequestInput::Server],
        _ => &[],
    }
}

/// Request data categories read in a fragment. `code` is the masked view and
/// `stripped` the comment-free view of the same text.
pub fn detect_request_input(code: &str, stripped: &str) -> BTreeSet<RequestInput> {
    let mut found = BTreeSet::new();
    for caps in SUPERGLOBAL.captures_iter(code) {
        found.extend(categories(&caps[1]));
    }
    for caps in FILTER_INPUT.captures_iter(code) {
        found.extend(categories(&caps[1]));
    }
    if RAW_BODY.is_match(stripped) {
        found.insert(RequestInput::Body);
    }
    if HEADER_READ.is_match(code) {
        found.insert(RequestInput::Server);
    }
    found
}
