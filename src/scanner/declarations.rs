//! Top-level declaration boundaries.
//!
//! Works on the lexer's `code` view, so braces inside strings, comments and
//! inline HTML never affect depth. A declaration whose braces never balance
//! is emitted up to the end of the scanned range with `malformed` set.

use super::lexer::{is_ident_byte, LexedSource};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static DECLARATION_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(function|class|interface|trait)\b").expect("valid declaration regex")
});

const MODIFIERS: &[&str] = &["abstract", "final", "static", "public", "private", "protected"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    Function,
    Class,
    Interface,
    Trait,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub name: String,
    /// Offset of the first modifier, or of the keyword when there is none.
    pub header_start: usize,
    /// Offset of the declaration keyword.
    pub keyword_start: usize,
    /// Offset just past the declared name.
    pub name_end: usize,
    /// Parameter list between the parentheses, functions only.
    pub params: Option<Range<usize>>,
    /// From the opening `{` to just past the closing `}`.
    pub body: Option<Range<usize>>,
    pub end: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub modifiers: Vec<String>,
    pub malformed: bool,
}

impl Declaration {
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        &source[self.header_start..self.end]
    }

    pub fn body_text<'s>(&self, source: &'s str) -> &'s str {
        self.body
            .as_ref()
            .map(|range| &source[range.clone()])
            .unwrap_or_default()
    }

    /// Text between the name and the body, e.g. `extends Base implements I`.
    pub fn header_tail<'s>(&self, source: &'s str) -> &'s str {
        let end = self.body.as_ref().map(|b| b.start).unwrap_or(self.end);
        &source[self.name_end..end.max(self.name_end)]
    }

    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|m| m == modifier)
    }

    pub fn visibility(&self) -> Option<&str> {
        self.modifiers
            .iter()
            .map(String::as_str)
            .find(|m| matches!(*m, "public" | "private" | "protected"))
    }
}

/// Lazy iterator over the declarations of one byte range.
pub struct DeclarationScanner<'l, 'a> {
    lexed: &'l LexedSource<'a>,
    pos: usize,
    limit: usize,
}

/// Declarations at the top level of the whole file.
pub fn declarations<'l, 'a>(lexed: &'l LexedSource<'a>) -> DeclarationScanner<'l, 'a> {
    declarations_in(lexed, 0..lexed.code().len())
}

/// Declarations directly inside `range`, e.g. the methods of a class body.
pub fn declarations_in<'l, 'a>(
    lexed: &'l LexedSource<'a>,
    range: Range<usize>,
) -> DeclarationScanner<'l, 'a> {
    DeclarationScanner {
        lexed,
        pos: range.start,
        limit: range.end.min(lexed.code().len()),
    }
}

impl Iterator for DeclarationScanner<'_, '_> {
    type Item = Declaration;

    fn next(&mut self) -> Option<Declaration> {
        let code = &self.lexed.code()[..self.limit];
        while self.pos < self.limit {
            let m = DECLARATION_KEYWORD.find_at(code, self.pos)?;
            self.pos = m.end();
            match self.candidate_at(m.start(), m.end(), m.as_str()) {
                Candidate::Named(decl) => {
                    self.pos = decl.end.max(m.end());
                    return Some(decl);
                }
                Candidate::Anonymous(end) => self.pos = end.max(m.end()),
                Candidate::NotDeclaration => {}
            }
        }
        None
    }
}

enum Candidate {
    Named(Declaration),
    /// Closure or anonymous class; scanning resumes after its body.
    Anonymous(usize),
    NotDeclaration,
}

impl DeclarationScanner<'_, '_> {
    fn candidate_at(&self, start: usize, keyword_end: usize, keyword: &str) -> Candidate {
        let code = self.lexed.code().as_bytes();
        let kind = match keyword.to_ascii_lowercase().as_str() {
            "function" => DeclarationKind::Function,
            "class" => DeclarationKind::Class,
            "interface" => DeclarationKind::Interface,
            _ => DeclarationKind::Trait,
        };

        let before = &code[previous_token(code, start)];
        if before.ends_with(b"->") || before.ends_with(b"::") || before.ends_with(b"$") {
            return Candidate::NotDeclaration;
        }
        if kind == DeclarationKind::Class && before.eq_ignore_ascii_case(b"new") {
            return Candidate::Anonymous(self.skip_body(keyword_end));
        }

        let mut j = skip_whitespace(code, keyword_end, self.limit);
        if kind == DeclarationKind::Function && code.get(j) == Some(&b'&') {
            j = skip_whitespace(code, j + 1, self.limit);
        }
        let name_start = j;
        while j < self.limit && is_ident_byte(code[j]) {
            j += 1;
        }
        if j == name_start || code[name_start].is_ascii_digit() {
            return match kind {
                DeclarationKind::Function if code.get(j) == Some(&b'(') => {
                    Candidate::Anonymous(self.skip_body(j))
                }
                _ => Candidate::NotDeclaration,
            };
        }
        let name = self.lexed.text()[name_start..j].to_string();
        let name_end = j;

        let mut params = None;
        let mut malformed = false;
        if kind == DeclarationKind::Function {
            let open = skip_whitespace(code, j, self.limit);
            if code.get(open) != Some(&b'(') {
                return Candidate::NotDeclaration;
            }
            match matching_close(code, open, self.limit, b'(', b')') {
                Some(close) => {
                    params = Some(open + 1..close);
                    j = close + 1;
                }
                None => {
                    params = Some(open + 1..self.limit);
                    j = self.limit;
                    malformed = true;
                }
            }
        }

        let (body, end) = match find_body_open(code, j, self.limit) {
            Some(BodyStart::Brace(open)) => {
                match matching_close(code, open, self.limit, b'{', b'}') {
                    Some(close) => (Some(open..close + 1), close + 1),
                    None => {
                        malformed = true;
                        (Some(open..self.limit), self.limit)
                    }
                }
            }
            Some(BodyStart::Semicolon(at)) => (None, at + 1),
            None => {
                malformed = true;
                (None, self.limit)
            }
        };

        let (header_start, modifiers) = collect_modifiers(code, start);
        Candidate::Named(Declaration {
            kind,
            name,
            header_start,
            keyword_start: start,
            name_end,
            params,
            body,
            end,
            start_line: self.lexed.line_of(start),
            end_line: self.lexed.line_of(end.saturating_sub(1).max(start)),
            modifiers,
            malformed,
        })
    }

    /// End of the braced body following `from`, or `from` for arrow functions.
    fn skip_body(&self, from: usize) -> usize {
        let code = self.lexed.code().as_bytes();
        match find_body_open(code, from, self.limit) {
            Some(BodyStart::Brace(open)) => matching_close(code, open, self.limit, b'{', b'}')
                .map(|close| close + 1)
                .unwrap_or(self.limit),
            _ => from,
        }
    }
}

enum BodyStart {
    Brace(usize),
    Semicolon(usize),
}

fn find_body_open(code: &[u8], from: usize, limit: usize) -> Option<BodyStart> {
    let mut depth = 0usize;
    for (i, &b) in code.iter().enumerate().take(limit).skip(from) {
        match b {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b'{' if depth == 0 => return Some(BodyStart::Brace(i)),
            b';' if depth == 0 => return Some(BodyStart::Semicolon(i)),
            _ => {}
        }
    }
    None
}

/// Offset of the delimiter closing the one at `open`, if it closes before `limit`.
pub fn matching_close(code: &[u8], open: usize, limit: usize, open_b: u8, close_b: u8) -> Option<usize> {
    let mut depth = 0usize;
    for (i, &b) in code.iter().enumerate().take(limit).skip(open) {
        if b == open_b {
            depth += 1;
        } else if b == close_b {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

fn skip_whitespace(code: &[u8], mut i: usize, limit: usize) -> usize {
    while i < limit && code[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Range of the run of non-whitespace bytes immediately before `offset`.
fn previous_token(code: &[u8], offset: usize) -> Range<usize> {
    let mut end = offset;
    while end > 0 && code[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    let mut start = end;
    while start > 0 && !code[start - 1].is_ascii_whitespace() {
        start -= 1;
    }
    start..end
}

fn collect_modifiers(code: &[u8], keyword_start: usize) -> (usize, Vec<String>) {
    let mut header_start = keyword_start;
    let mut modifiers = Vec::new();
    loop {
        let token = previous_token(code, header_start);
        let word = String::from_utf8_lossy(&code[token.clone()]).to_ascii_lowercase();
        if token.is_empty() || !MODIFIERS.contains(&word.as_str()) {
            break;
        }
        header_start = token.start;
        modifiers.push(word);
    }
    modifiers.reverse();
    (header_start, modifiers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::lexer::{lex, lex_code};
    use indoc::indoc;

    #[test]
    fn test_finds_top_level_functions_with_spans() {
        let src = indoc! {r#"
            <?php
            function first($a) {
                if ($a) { return 1; }
            }

            function second() {
                $s = "}";
            }
        "#};
        let lexed = lex(src);
        let decls: Vec<_> = declarations(&lexed).collect();
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].name, "first");
        assert_eq!((decls[0].start_line, decls[0].end_line), (2, 4));
        assert_eq!(decls[1].name, "second");
        assert_eq!((decls[1].start_line, decls[1].end_line), (6, 8));
        assert!(decls.iter().all(|d| !d.malformed));
    }

    #[test]
    fn test_braces_in_comments_are_ignored() {
        let src = "function f() {\n  // }\n  /* } */\n  # }\n  return 1;\n}\nfunction g() {}";
        let lexed = lex_code(src);
        let names: Vec<_> = declarations(&lexed).map(|d| d.name).collect();
        assert_eq!(names, vec!["f", "g"]);
    }

    #[test]
    fn test_unbalanced_declaration_is_malformed() {
        let src = "<?php\nfunction broken() {\n  if (true) {\n    echo 1;\n";
        let lexed = lex(src);
        let decls: Vec<_> = declarations(&lexed).collect();
        assert_eq!(decls.len(), 1);
        assert!(decls[0].malformed);
        assert_eq!(decls[0].end, src.len());
        assert!(decls[0].end_line >= decls[0].start_line);
    }

    #[test]
    fn test_closures_are_not_declarations() {
        let src = "$f = function ($x) { return $x; };\nfunction named() { $g = function () {}; }";
        let lexed = lex_code(src);
        let decls: Vec<_> = declarations(&lexed).collect();
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].name, "named");
    }

    #[test]
    fn test_class_with_modifiers_and_methods() {
        let src = indoc! {r#"
            abstract class Repo extends Base implements Countable {
                public static function find($id) { return null; }
                abstract protected function save(array $row);
            }
        "#};
        let lexed = lex_code(src);
        let class = declarations(&lexed).next().unwrap();
        assert_eq!(class.kind, DeclarationKind::Class);
        assert_eq!(class.modifiers, vec!["abstract"]);
        assert!(class.header_tail(src).contains("extends Base"));

        let body = class.body.clone().unwrap();
        let methods: Vec<_> = declarations_in(&lexed, body.start + 1..body.end - 1).collect();
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].modifiers, vec!["public", "static"]);
        assert_eq!(methods[0].visibility(), Some("public"));
        assert!(methods[1].body.is_none());
        assert!(methods[1].has_modifier("abstract"));
        assert!(!methods[1].malformed);
    }

    #[test]
    fn test_class_constant_and_anonymous_class_skipped() {
        let src = "$n = Foo::class; $o = new class { function x() {} };";
        let lexed = lex_code(src);
        assert_eq!(declarations(&lexed).count(), 0);
    }

    #[test]
    fn test_function_inside_conditional_wrapper() {
        let src = "if (!function_exists('h')) {\n  function h() { return 1; }\n}";
        let lexed = lex_code(src);
        let decls: Vec<_> = declarations(&lexed).collect();
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].name, "h");
        assert_eq!(decls[0].start_line, 2);
    }

    #[test]
    fn test_return_by_reference_and_return_type() {
        let src = "function &items(): ?array { return $this->items; }";
        let lexed = lex_code(src);
        let decl = declarations(&lexed).next().unwrap();
        assert_eq!(decl.name, "items");
        assert_eq!(decl.body_text(src), "{ return $this->items; }");
    }
}
