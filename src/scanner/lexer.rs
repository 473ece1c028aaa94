//! String- and comment-aware lexing of PHP source text.
//!
//! The lexer is an explicit finite-state machine over bytes. It does not
//! produce tokens; it produces two *views* of the text with the same byte
//! length as the input text, so offsets and line numbers are shared:
//!
//! - `code`: comments, string bodies and inline HTML replaced by spaces.
//!   Brace matching, keyword counting and call detection run here.
//! - `stripped`: only comments replaced. Rules that need string contents
//!   (array keys, SQL literals, include targets) run here.
//!
//! Newlines are never masked. Every delimiter is ASCII, so masking a region
//! byte-by-byte keeps both views valid UTF-8.

use std::ops::Range;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QuoteStyle {
    Single,
    Double,
    Backtick,
    Heredoc,
    Nowdoc,
}

impl QuoteStyle {
    /// Whether `$var` inside the literal is interpolated at runtime.
    pub fn interpolates(self) -> bool {
        matches!(
            self,
            QuoteStyle::Double | QuoteStyle::Backtick | QuoteStyle::Heredoc
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StringLiteral {
    /// Raw content between the delimiters, escapes left as written.
    pub value: String,
    /// Offset of the opening delimiter.
    pub start: usize,
    /// Offset just past the closing delimiter.
    pub end: usize,
    pub line: usize,
    pub style: QuoteStyle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LexState {
    InlineHtml,
    Code,
    SingleQuoted,
    DoubleQuoted,
    Backtick,
    Heredoc,
    LineComment,
    BlockComment,
}

/// A string or comment still open at end of input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unterminated {
    pub construct: &'static str,
    pub line: usize,
}

#[derive(Debug)]
pub struct LexedSource<'a> {
    text: &'a str,
    code: String,
    stripped: String,
    strings: Vec<StringLiteral>,
    line_starts: Vec<usize>,
    php_lines: usize,
    html_lines: usize,
    unterminated: Option<Unterminated>,
}

impl<'a> LexedSource<'a> {
    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn stripped(&self) -> &str {
        &self.stripped
    }

    /// String literals in source order.
    pub fn strings(&self) -> &[StringLiteral] {
        &self.strings
    }

    /// String literals whose opening delimiter lies inside `range`.
    pub fn strings_in(&self, range: Range<usize>) -> &[StringLiteral] {
        let from = self.strings.partition_point(|s| s.start < range.start);
        let to = self.strings.partition_point(|s| s.start < range.end);
        &self.strings[from..to.max(from)]
    }

    /// 1-indexed line of a byte offset.
    pub fn line_of(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= offset).max(1)
    }

    pub fn line_count(&self) -> usize {
        crate::core::count_lines(self.text)
    }

    /// Byte range of a 1-indexed line, without its newline.
    pub fn line_range(&self, line: usize) -> Range<usize> {
        let idx = line.saturating_sub(1).min(self.line_starts.len() - 1);
        let start = self.line_starts[idx];
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        start..end.max(start)
    }

    pub fn php_lines(&self) -> usize {
        self.php_lines
    }

    pub fn html_lines(&self) -> usize {
        self.html_lines
    }

    pub fn unterminated(&self) -> Option<&Unterminated> {
        self.unterminated.as_ref()
    }
}

/// Lex `text`. Files without any `<?` opener are treated as pure code.
pub fn lex(text: &str) -> LexedSource<'_> {
    let initial = if text.contains("<?") {
        LexState::InlineHtml
    } else {
        LexState::Code
    };
    Lexer::new(text, initial).run()
}

/// Lex a fragment that is known to be code (no inline HTML).
pub fn lex_code(text: &str) -> LexedSource<'_> {
    Lexer::new(text, LexState::Code).run()
}

struct Lexer<'a> {
    text: &'a str,
    bytes: &'a [u8],
    code: Vec<u8>,
    stripped: Vec<u8>,
    strings: Vec<StringLiteral>,
    line_starts: Vec<usize>,
    php_line: Vec<bool>,
    html_line: Vec<bool>,
    state: LexState,
    open_start: usize,
    open_content: usize,
    heredoc_label: String,
    heredoc_nowdoc: bool,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str, state: LexState) -> Self {
        let bytes = text.as_bytes();
        let line_starts: Vec<usize> = std::iter::once(0)
            .chain(
                bytes
                    .iter()
                    .enumerate()
                    .filter(|(_, &b)| b == b'\n')
                    .map(|(i, _)| i + 1),
            )
            .collect();
        let lines = line_starts.len();
        Self {
            text,
            bytes,
            code: bytes.to_vec(),
            stripped: bytes.to_vec(),
            strings: Vec::new(),
            line_starts,
            php_line: vec![false; lines],
            html_line: vec![false; lines],
            state,
            open_start: 0,
            open_content: 0,
            heredoc_label: String::new(),
            heredoc_nowdoc: false,
            line: 0,
        }
    }

    fn run(mut self) -> LexedSource<'a> {
        let mut i = 0;
        while i < self.bytes.len() {
            i = self.step(i);
        }

        let unterminated = self.unterminated_construct().map(|construct| Unterminated {
            construct,
            line: line_index(&self.line_starts, self.open_start) + 1,
        });

        let php_lines = self.php_line.iter().filter(|&&b| b).count();
        let html_lines = self.html_line.iter().filter(|&&b| b).count();

        LexedSource {
            text: self.text,
            code: into_string(self.code),
            stripped: into_string(self.stripped),
            strings: self.strings,
            line_starts: self.line_starts,
            php_lines,
            html_lines,
            unterminated,
        }
    }

    fn unterminated_construct(&self) -> Option<&'static str> {
        match self.state {
            LexState::SingleQuoted | LexState::DoubleQuoted | LexState::Backtick => {
                Some("string literal")
            }
            LexState::Heredoc => Some("heredoc"),
            LexState::BlockComment => Some("block comment"),
            LexState::InlineHtml | LexState::Code | LexState::LineComment => None,
        }
    }

    /// Advance from `i`, returning the next offset to process.
    fn step(&mut self, i: usize) -> usize {
        let c = self.bytes[i];
        if c == b'\n' {
            self.line += 1;
        } else if !c.is_ascii_whitespace() {
            match self.state {
                LexState::InlineHtml => self.html_line[self.line] = true,
                _ => self.php_line[self.line] = true,
            }
        }

        match self.state {
            LexState::InlineHtml => self.step_html(i),
            LexState::Code => self.step_code(i),
            LexState::SingleQuoted => self.step_quoted(i, b'\''),
            LexState::DoubleQuoted => self.step_quoted(i, b'"'),
            LexState::Backtick => self.step_quoted(i, b'`'),
            LexState::Heredoc => self.step_heredoc(i),
            LexState::LineComment => self.step_line_comment(i),
            LexState::BlockComment => self.step_block_comment(i),
        }
    }

    fn step_html(&mut self, i: usize) -> usize {
        if self.starts_with(i, b"<?") {
            let len = if self.starts_with_ignore_case(i, b"<?php") {
                5
            } else if self.starts_with(i, b"<?=") {
                3
            } else {
                2
            };
            self.html_line[self.line] = false;
            self.php_line[self.line] = true;
            self.state = LexState::Code;
            return i + len;
        }
        mask(&mut self.code, i);
        i + 1
    }

    fn step_code(&mut self, i: usize) -> usize {
        let next = self.bytes.get(i + 1).copied();
        match self.bytes[i] {
            b'\'' => self.open(i, LexState::SingleQuoted),
            b'"' => self.open(i, LexState::DoubleQuoted),
            b'`' => self.open(i, LexState::Backtick),
            // `#[` is an attribute, not a comment
            b'#' if next != Some(b'[') => {
                self.mask_both(i);
                self.state = LexState::LineComment;
                i + 1
            }
            b'/' if next == Some(b'/') => {
                self.mask_both(i);
                self.mask_both(i + 1);
                self.state = LexState::LineComment;
                i + 2
            }
            b'/' if next == Some(b'*') => {
                self.open_start = i;
                self.mask_both(i);
                self.mask_both(i + 1);
                self.state = LexState::BlockComment;
                i + 2
            }
            b'<' if self.starts_with(i, b"<<<") => match self.heredoc_opener(i) {
                Some((label, nowdoc, content_start)) => {
                    self.heredoc_label = label;
                    self.heredoc_nowdoc = nowdoc;
                    self.open_start = i;
                    self.open_content = content_start;
                    self.state = LexState::Heredoc;
                    // the opener's newline is consumed by the heredoc state
                    content_start - 1
                }
                None => i + 1,
            },
            b'?' if next == Some(b'>') => {
                self.state = LexState::InlineHtml;
                i + 2
            }
            _ => i + 1,
        }
    }

    fn open(&mut self, i: usize, state: LexState) -> usize {
        self.open_start = i;
        self.open_content = i + 1;
        self.state = state;
        i + 1
    }

    fn step_quoted(&mut self, i: usize, delimiter: u8) -> usize {
        let c = self.bytes[i];
        if c == b'\\' {
            mask(&mut self.code, i);
            if i + 1 < self.bytes.len() {
                if self.bytes[i + 1] == b'\n' {
                    self.line += 1;
                }
                mask(&mut self.code, i + 1);
            }
            return i + 2;
        }
        if c == delimiter {
            let style = match delimiter {
                b'\'' => QuoteStyle::Single,
                b'"' => QuoteStyle::Double,
                _ => QuoteStyle::Backtick,
            };
            self.close_literal(self.open_content, i, i + 1, style);
            self.state = LexState::Code;
            return i + 1;
        }
        mask(&mut self.code, i);
        i + 1
    }

    fn step_heredoc(&mut self, i: usize) -> usize {
        // Positioned on the newline ending the opener or the previous line.
        if self.bytes[i] != b'\n' {
            mask(&mut self.code, i);
            return i + 1;
        }
        let line_start = i + 1;
        let mut k = line_start;
        while k < self.bytes.len() && matches!(self.bytes[k], b' ' | b'\t') {
            k += 1;
        }
        let label_len = self.heredoc_label.len();
        let closes = self.starts_with(k, self.heredoc_label.as_bytes())
            && self
                .bytes
                .get(k + label_len)
                .is_none_or(|&b| !is_ident_byte(b));
        if closes {
            let style = if self.heredoc_nowdoc {
                QuoteStyle::Nowdoc
            } else {
                QuoteStyle::Heredoc
            };
            let content_end = i.max(self.open_content);
            self.close_literal(self.open_content, content_end, k + label_len, style);
            self.state = LexState::Code;
            return k + label_len;
        }
        i + 1
    }

    fn step_line_comment(&mut self, i: usize) -> usize {
        if self.bytes[i] == b'\n' {
            self.state = LexState::Code;
            return i + 1;
        }
        if self.starts_with(i, b"?>") {
            self.state = LexState::InlineHtml;
            return i + 2;
        }
        self.mask_both(i);
        i + 1
    }

    fn step_block_comment(&mut self, i: usize) -> usize {
        if self.starts_with(i, b"*/") {
            self.mask_both(i);
            self.mask_both(i + 1);
            self.state = LexState::Code;
            return i + 2;
        }
        self.mask_both(i);
        i + 1
    }

    fn close_literal(&mut self, content_start: usize, content_end: usize, end: usize, style: QuoteStyle) {
        let value = self
            .text
            .get(content_start..content_end)
            .unwrap_or_default()
            .to_string();
        self.strings.push(StringLiteral {
            value,
            start: self.open_start,
            end,
            line: line_index(&self.line_starts, self.open_start) + 1,
            style,
        });
    }

    /// Parse `<<<LABEL`, `<<<"LABEL"` or `<<<'LABEL'` followed by a newline.
    fn heredoc_opener(&self, i: usize) -> Option<(String, bool, usize)> {
        let mut j = i + 3;
        while j < self.bytes.len() && matches!(self.bytes[j], b' ' | b'\t') {
            j += 1;
        }
        let quote = match self.bytes.get(j) {
            Some(&q @ (b'\'' | b'"')) => {
                j += 1;
                Some(q)
            }
            _ => None,
        };
        let label_start = j;
        while j < self.bytes.len() && is_ident_byte(self.bytes[j]) {
            j += 1;
        }
        if j == label_start || self.bytes[label_start].is_ascii_digit() {
            return None;
        }
        let label = self.text.get(label_start..j)?.to_string();
        if let Some(q) = quote {
            if self.bytes.get(j) != Some(&q) {
                return None;
            }
            j += 1;
        }
        if self.bytes.get(j) == Some(&b'\r') {
            j += 1;
        }
        if self.bytes.get(j) != Some(&b'\n') {
            return None;
        }
        Some((label, quote == Some(b'\''), j + 1))
    }

    fn mask_both(&mut self, i: usize) {
        mask(&mut self.code, i);
        mask(&mut self.stripped, i);
    }

    fn starts_with(&self, i: usize, needle: &[u8]) -> bool {
        self.bytes.get(i..i + needle.len()) == Some(needle)
    }

    fn starts_with_ignore_case(&self, i: usize, needle: &[u8]) -> bool {
        self.bytes
            .get(i..i + needle.len())
            .is_some_and(|s| s.eq_ignore_ascii_case(needle))
    }
}

fn mask(buf: &mut [u8], i: usize) {
    if let Some(b) = buf.get_mut(i) {
        if *b != b'\n' {
            *b = b' ';
        }
    }
}

fn line_index(line_starts: &[usize], offset: usize) -> usize {
    line_starts
        .partition_point(|&start| start <= offset)
        .saturating_sub(1)
}

pub(crate) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

fn into_string(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}
