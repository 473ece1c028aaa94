use crate::scanner::{matching_close, LexedSource, StringLiteral};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static NESTED_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(function|fn)\b\s*&?\s*(?:[A-Za-z_]\w*)?\s*\(").expect("valid nested function regex")
});

/// Views of one function body, relative to the body's first byte.
///
/// `code`/`stripped` cover the whole body including nested closures.
/// `own_code`/`own_stripped` blank the bodies of nested functions so that
/// their `return` statements are not mistaken for the enclosing one's.
#[derive(Debug)]
pub struct FunctionBody<'l> {
    pub offset: usize,
    pub code: String,
    pub stripped: String,
    pub own_code: String,
    pub own_stripped: String,
    /// String literals outside nested functions, offsets relative to the body.
    pub strings: Vec<RelativeString<'l>>,
    pub nested_functions: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct RelativeString<'l> {
    pub start: usize,
    pub end: usize,
    pub literal: &'l StringLiteral,
}

impl<'l> FunctionBody<'l> {
    pub fn new(lexed: &'l LexedSource<'_>, range: Range<usize>) -> Self {
        let code = lexed.code()[range.clone()].to_string();
        let stripped = lexed.stripped()[range.clone()].to_string();
        let (nested, nested_functions) = nested_function_bodies(&code);

        let mut own_code = code.clone().into_bytes();
        let mut own_stripped = stripped.clone().into_bytes();
        for r in &nested {
            blank(&mut own_code, r.clone());
            blank(&mut own_stripped, r.clone());
        }

        let strings = lexed
            .strings_in(range.clone())
            .iter()
            .map(|literal| RelativeString {
                start: literal.start - range.start,
                end: literal.end.min(range.end) - range.start,
                literal,
            })
            .filter(|s| !nested.iter().any(|r| r.contains(&s.start)))
            .collect();

        Self {
            offset: range.start,
            code,
            stripped,
            own_code: bytes_to_string(own_code),
            own_stripped: bytes_to_string(own_stripped),
            strings,
            nested_functions,
        }
    }

    /// The literal whose opening delimiter is at relative offset `at`.
    pub fn string_at(&self, at: usize) -> Option<&RelativeString<'l>> {
        self.strings
            .binary_search_by_key(&at, |s| s.start)
            .ok()
            .map(|idx| &self.strings[idx])
    }
}

/// Bodies of closures and nested named functions, plus how many there are
/// (arrow functions count but have no braced body).
fn nested_function_bodies(code: &str) -> (Vec<Range<usize>>, u32) {
    let bytes = code.as_bytes();
    let mut ranges: Vec<Range<usize>> = Vec::new();
    let mut count = 0;

    for m in NESTED_FUNCTION.find_iter(code) {
        let start = m.start();
        if ranges.iter().any(|r| r.contains(&start)) {
            continue;
        }
        if start >= 2 && matches!(&bytes[start - 2..start], b"->" | b"::") {
            continue;
        }
        count += 1;
        let open_paren = m.end() - 1;
        let Some(close_paren) = matching_close(bytes, open_paren, bytes.len(), b'(', b')') else {
            continue;
        };
        if let Some(body) = braced_body_after(bytes, close_paren + 1) {
            ranges.push(body);
        }
    }

    (ranges, count)
}

/// `{ ... }` following a parameter list, allowing `use (...)` and a return type.
fn braced_body_after(bytes: &[u8], from: usize) -> Option<Range<usize>> {
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(from) {
        match b {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b'{' if depth == 0 => {
                let close = matching_close(bytes, i, bytes.len(), b'{', b'}')?;
                return Some(i..close + 1);
            }
            // arrow function expression or statement end
            b'=' | b';' | b',' if depth == 0 => return None,
            _ => {}
        }
    }
    None
}

fn blank(buf: &mut [u8], range: Range<usize>) {
    for b in &mut buf[range] {
        if *b != b'\n' {
            *b = b' ';
        }
    }
}

fn bytes_to_string(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::lex_code;

    #[test]
    fn test_nested_closure_bodies_are_blanked() {
        let src = "{ $f = function ($x) use ($y) { return $x; }; $g = fn($z) => $z * 2; return $f; }";
        let lexed = lex_code(src);
        let body = FunctionBody::new(&lexed, 0..src.len());
        assert_eq!(body.nested_functions, 2);
        assert!(!body.own_code.contains("return $x;"));
        assert!(body.own_code.contains("return $f;"));
        assert!(body.code.contains("return $x;"));
    }

    #[test]
    fn test_strings_inside_closures_are_dropped() {
        let src = "{ $a['k'] = 1; array_map(function ($r) { return $r['inner']; }, $a); }";
        let lexed = lex_code(src);
        let body = FunctionBody::new(&lexed, 0..src.len());
        let values: Vec<_> = body.strings.iter().map(|s| s.literal.value.as_str()).collect();
        assert_eq!(values, vec!["k"]);
        assert!(body.string_at(5).is_some());
    }

    #[test]
    fn test_function_exists_is_not_nested_function() {
        let src = "{ if (function_exists('x')) { x(); } }";
        let lexed = lex_code(src);
        assert_eq!(FunctionBody::new(&lexed, 0..src.len()).nested_functions, 0);
    }
}
