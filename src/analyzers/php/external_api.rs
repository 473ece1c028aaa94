use crate::core::{ExternalCall, ExternalCallKind};
use crate::scanner::LexedSource;
use crate::utils::truncate_chars;
use once_cell::sync::Lazy;
use regex::Regex;

static EXTERNAL_CALL_PATTERNS: Lazy<Vec<(Regex, ExternalCallKind)>> = Lazy::new(|| {
    [
        (r"(?i)\bcurl_init\s*\(", ExternalCallKind::Curl),
        (r"\bCURLOPT_URL\s*,", ExternalCallKind::CurlUrl),
        (r#"(?i)\bfile_get_contents\s*\(\s*['"]https?://"#, ExternalCallKind::HttpStream),
        (r"(?i)\b(?:fsockopen|stream_socket_client)\s*\(", ExternalCallKind::Socket),
        (r"(?i)\bnew\s+\\?SoapClient\s*\(", ExternalCallKind::Soap),
    ]
    .into_iter()
    .map(|(pattern, kind)| (Regex::new(pattern).expect("valid external call regex"), kind))
    .collect()
});

pub fn find_external_calls(lexed: &LexedSource<'_>, snippet_length: usize) -> Vec<ExternalCall> {
    let text = lexed.stripped();
    let mut calls: Vec<ExternalCall> = EXTERNAL_CALL_PATTERNS
        .iter()
        .flat_map(|(pattern, kind)| {
            pattern.find_iter(text).map(move |m| {
                let line = lexed.line_of(m.start());
                ExternalCall {
                    kind: *kind,
                    line,
                    snippet: truncate_chars(&text[lexed.line_range(line)], snippet_length),
                }
            })
        })
        .collect();
    calls.sort_by_key(|c| c.line);
    calls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::lex;
    use indoc::indoc;

    #[test]
    fn test_detects_outbound_calls() {
        let src = indoc! {r#"
            <?php
            $ch = curl_init();
            curl_setopt($ch, CURLOPT_URL, $url);
            $rates = file_get_contents('https://api.example.com/rates');
            $local = file_get_contents('cache/rates.json');
            $soap = new SoapClient($wsdl);
        "#};
        let lexed = lex(src);
        let kinds: Vec<_> = find_external_calls(&lexed, 100).iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ExternalCallKind::Curl,
                ExternalCallKind::CurlUrl,
                ExternalCallKind::HttpStream,
                ExternalCallKind::Soap,
            ]
        );
    }
}
