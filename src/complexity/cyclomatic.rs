use once_cell::sync::Lazy;
use regex::Regex;

static BRANCH_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(if|elseif|case|for|foreach|while|do|catch|and|or)\b")
        .expect("valid branch keyword regex")
});

/// Branch points found in a body, by kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BranchBreakdown {
    pub conditionals: u32,
    pub loops: u32,
    pub logical_operators: u32,
    pub ternaries: u32,
    pub catches: u32,
}

impl BranchBreakdown {
    pub fn total(&self) -> u32 {
        self.conditionals + self.loops + self.logical_operators + self.ternaries + self.catches
    }
}

/// Cyclomatic complexity of a masked code fragment: 1 plus every branch point.
pub fn calculate_cyclomatic(code: &str) -> u32 {
    1 + count_branches(code).total()
}

pub fn count_branches(code: &str) -> BranchBreakdown {
    let mut breakdown = BranchBreakdown::default();
    let bytes = code.as_bytes();

    for m in BRANCH_KEYWORD.find_iter(code) {
        if is_name_position(bytes, m.start()) {
            continue;
        }
        match m.as_str().to_ascii_lowercase().as_str() {
            "if" | "elseif" | "case" => breakdown.conditionals += 1,
            "while" if closes_do_loop(bytes, m.start()) => {}
            "for" | "foreach" | "while" | "do" => breakdown.loops += 1,
            "catch" => breakdown.catches += 1,
            _ => breakdown.logical_operators += 1,
        }
    }

    let mut i = 0;
    while i < bytes.len() {
        match (bytes[i], bytes.get(i + 1).copied()) {
            (b'&', Some(b'&')) | (b'|', Some(b'|')) => {
                breakdown.logical_operators += 1;
                i += 2;
            }
            (b'?', Some(b'?')) => {
                breakdown.ternaries += 1;
                i += 2;
            }
            (b'?', next) if is_ternary_follower(next) => {
                breakdown.ternaries += 1;
                i += 1;
            }
            _ => i += 1,
        }
    }

    breakdown
}

/// A word after `$`, `->`, `?->` or `::` is a variable or member name.
fn is_name_position(code: &[u8], offset: usize) -> bool {
    let mut i = offset;
    while i > 0 && code[i - 1].is_ascii_whitespace() {
        i -= 1;
    }
    let before = &code[..i];
    before.ends_with(b"$") || before.ends_with(b"->") || before.ends_with(b"::")
}

/// `?` followed by these is a ternary; `?>`, `?->` and `?Type` are not.
fn is_ternary_follower(next: Option<u8>) -> bool {
    matches!(
        next,
        Some(b' ' | b'\t' | b'\r' | b'\n' | b':' | b'$' | b'\'' | b'"' | b'(' | b'[' | b'!')
    ) || next.is_some_and(|b| b.is_ascii_digit())
}

/// Whether the `while` at `offset` is the tail of a `do { ... } while (...)`.
fn closes_do_loop(code: &[u8], offset: usize) -> bool {
    let mut i = offset;
    while i > 0 && code[i - 1].is_ascii_whitespace() {
        i -= 1;
    }
    if i == 0 || code[i - 1] != b'}' {
        return false;
    }

    let mut depth = 0usize;
    let mut j = i;
    while j > 0 {
        j -= 1;
        match code[j] {
            b'}' => depth += 1,
            b'{' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return false;
    }

    let mut k = j;
    while k > 0 && code[k - 1].is_ascii_whitespace() {
        k -= 1;
    }
    k >= 2
        && code[k - 2..k].eq_ignore_ascii_case(b"do")
        && (k == 2 || !crate::scanner::lexer::is_ident_byte(code[k - 3]))
}
