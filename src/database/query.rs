//! Embedded SQL: candidate assembly and clause parsing.
//!
//! Candidates are string literals that open with a statement keyword.
//! Literals joined by `.` are stitched together and any non-literal operand is
//! replaced by a `?` placeholder, so `"SELECT a FROM t WHERE id = " . $id`
//! parses like a prepared statement.

use crate::scanner::LexedSource;
use crate::utils::{squash_whitespace, truncate_chars};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Other,
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StatementKind::Select => "select",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
            StatementKind::Other => "other",
        };
        write!(f, "{s}")
    }
}

/// One recognised statement and the evidence it gives about tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub line: usize,
    pub kind: StatementKind,
    pub target_table: String,
    pub referenced_columns: BTreeSet<String>,
    /// Other tables named in FROM lists and JOINs, with their alias-resolved
    /// columns.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub joined_tables: BTreeMap<String, BTreeSet<String>>,
    /// Columns compared with `=`, per table.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub equality_filters: BTreeMap<String, BTreeSet<String>>,
    pub snippet: String,
}

impl QueryRecord {
    /// Every (table, columns) pair this query contributes, target first.
    pub fn table_columns(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        std::iter::once((self.target_table.as_str(), &self.referenced_columns))
            .chain(self.joined_tables.iter().map(|(t, c)| (t.as_str(), c)))
    }
}

static STATEMENT_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*\(?\s*(SELECT|INSERT|UPDATE|DELETE|REPLACE|CREATE|ALTER|DROP|TRUNCATE)\b")
        .expect("valid statement regex")
});

static QUOTED_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*""#).expect("valid quoted value regex")
});

static SELECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*\(?\s*SELECT\s+(?:DISTINCT\s+|SQL_CALC_FOUND_ROWS\s+)*(.*?)\s+FROM\s+(.+?)(?:\b(?:WHERE|(?:LEFT|RIGHT|INNER|OUTER|CROSS|NATURAL|STRAIGHT_JOIN)\b|JOIN|GROUP|ORDER|LIMIT|HAVING|UNION)\b|;|\)|$)")
        .expect("valid select regex")
});

static INSERT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*(INSERT|REPLACE)\s+(?:LOW_PRIORITY\s+|DELAYED\s+|HIGH_PRIORITY\s+|IGNORE\s+)*(?:INTO\s+)?([\w.]+)\s*(?:\(([^)]*)\)|SET\s+(.*?)(?:\bON\s+DUPLICATE\b|;|$))?")
        .expect("valid insert regex")
});

static UPDATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*UPDATE\s+(?:LOW_PRIORITY\s+|IGNORE\s+)*([\w.]+)(?:\s+(?:AS\s+)?(\w+))?\s+SET\s+(.*?)(?:\bWHERE\b|\bORDER\s+BY\b|\bLIMIT\b|;|$)")
        .expect("valid update regex")
});

static DELETE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*DELETE\s+(?:LOW_PRIORITY\s+|QUICK\s+|IGNORE\s+)*(?:\w+\s+)?FROM\s+([\w.]+)(?:\s+(?:AS\s+)?(\w+))?")
        .expect("valid delete regex")
});

static DDL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*(CREATE\s+(?:TEMPORARY\s+)?TABLE(?:\s+IF\s+NOT\s+EXISTS)?|ALTER\s+TABLE|DROP\s+TABLE(?:\s+IF\s+EXISTS)?|TRUNCATE(?:\s+TABLE)?)\s+([\w.]+)\s*(\((.*)\))?")
        .expect("valid ddl regex")
});

static JOIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bJOIN\s+([\w.]+)(?:\s+(?:AS\s+)?(\w+))?").expect("valid join regex")
});

static WHERE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bWHERE\s+(.+?)(?:\bGROUP\s+BY\b|\bORDER\s+BY\b|\bLIMIT\b|\bHAVING\b|\bUNION\b|;|$)")
        .expect("valid where regex")
});

static JOIN_CONDITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bON\s+(.+?)(?:\b(?:LEFT|RIGHT|INNER|OUTER|CROSS|JOIN|WHERE|GROUP|ORDER|LIMIT|HAVING)\b|;|$)")
        .expect("valid join condition regex")
});

static CONDITION_COLUMN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([A-Za-z_]\w*(?:\.[A-Za-z_]\w*)?)\s*(<=>|!=|<>|<=|>=|=|<|>|\bNOT\s+IN\b|\bIN\b|\bNOT\s+LIKE\b|\bLIKE\b|\bIS\b|\bNOT\s+BETWEEN\b|\bBETWEEN\b|\bREGEXP\b)")
        .expect("valid condition column regex")
});

static QUALIFIED_OPERAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:<=>|!=|<>|<=|>=|=|<|>)\s*([A-Za-z_]\w*\.[A-Za-z_]\w*)\b")
        .expect("valid qualified operand regex")
});

/// Words that look like identifiers in SQL but never name a column.
const SQL_KEYWORDS: &[&str] = &[
    "all", "and", "any", "as", "asc", "between", "by", "case", "desc", "distinct", "else", "end",
    "exists", "false", "from", "group", "having", "in", "inner", "is", "join", "left", "like",
    "limit", "not", "null", "on", "or", "order", "outer", "regexp", "right", "select", "set",
    "then", "true", "union", "using", "values", "when", "where", "xor", "interval", "cross",
    "natural", "straight_join", "update", "delete", "insert", "into", "count", "sum", "max",
    "min", "avg", "now", "if", "ifnull", "coalesce", "binary",
];

const TABLE_CONSTRAINTS: &[&str] = &[
    "primary", "key", "index", "unique", "constraint", "foreign", "fulltext", "spatial", "check",
];

/// English function words that never name a table or a selected column.
const PROSE_WORDS: &[&str] = &[
    "a", "an", "the", "your", "my", "our", "their", "his", "her", "its", "this", "that", "these",
    "those", "list", "here", "there", "it", "them", "me", "us", "you", "below", "above", "menu",
];

static STATEMENT_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:WHERE|JOIN|GROUP\s+BY|ORDER\s+BY|LIMIT|HAVING|UNION)")
        .expect("valid statement clause regex")
});

const MAX_PIECES: usize = 64;

fn is_keyword(word: &str) -> bool {
    SQL_KEYWORDS.contains(&word.to_ascii_lowercase().as_str())
}

/// Queries embedded in a file, in source order, at most `max_queries`.
pub fn extract_queries(
    lexed: &LexedSource<'_>,
    snippet_length: usize,
    max_queries: usize,
) -> Vec<QueryRecord> {
    let strings = lexed.strings();
    let code = lexed.code().as_bytes();
    let mut consumed = vec![false; strings.len()];
    let mut queries = Vec::new();

    for idx in 0..strings.len() {
        if queries.len() >= max_queries {
            break;
        }
        if consumed[idx] || !STATEMENT_START.is_match(&strings[idx].value) {
            continue;
        }
        let sql = assemble(lexed, code, idx, &mut consumed);
        if let Some(mut record) = parse_statement(&sql) {
            record.line = strings[idx].line;
            record.snippet = truncate_chars(&squash_whitespace(&sql), snippet_length);
            queries.push(record);
        }
    }

    queries
}

/// Follow `.` concatenations after literal `idx`, joining literal values and
/// replacing other operands with `?`.
fn assemble(lexed: &LexedSource<'_>, code: &[u8], idx: usize, consumed: &mut [bool]) -> String {
    let strings = lexed.strings();
    let mut sql = strings[idx].value.clone();
    let mut pos = strings[idx].end;
    let mut next = idx + 1;

    for _ in 0..MAX_PIECES {
        let after = skip_space(code, pos);
        if code.get(after) != Some(&b'.') || code.get(after + 1) == Some(&b'=') {
            break;
        }
        let operand = skip_space(code, after + 1);
        while next < strings.len() && strings[next].start < operand {
            next += 1;
        }
        if next < strings.len() && strings[next].start == operand {
            sql.push_str(&strings[next].value);
            consumed[next] = true;
            pos = strings[next].end;
            next += 1;
        } else {
            let end = expression_end(code, operand);
            if end == operand {
                break;
            }
            sql.push('?');
            pos = end;
        }
    }

    sql
}

fn skip_space(code: &[u8], mut pos: usize) -> usize {
    while pos < code.len() && code[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

/// End of a concatenation operand: the next `.`, `;` or `,` at depth zero, or
/// an unmatched closing bracket.
fn expression_end(code: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    let mut pos = start;
    while pos < code.len() {
        match code[pos] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            b'.' | b';' | b',' if depth == 0 => break,
            b'?' if depth == 0 && code.get(pos + 1) == Some(&b'>') => break,
            _ => {}
        }
        pos += 1;
    }
    // trailing whitespace belongs to the separator
    while pos > start && code[pos - 1].is_ascii_whitespace() {
        pos -= 1;
    }
    pos
}

/// Parse one assembled statement; `None` when the shape is not recognised.
pub fn parse_statement(sql: &str) -> Option<QueryRecord> {
    let sql = QUOTED_VALUE.replace_all(&sql.replace('`', ""), "?").into_owned();
    let written = STATEMENT_START.captures(&sql)?[1].to_string();
    let keyword = written.to_ascii_uppercase();
    if has_sentence_punctuation(&sql) {
        return None;
    }

    let mut query = match keyword.as_str() {
        "SELECT" => parse_select(&sql)?,
        "INSERT" | "REPLACE" => parse_insert(&sql)?,
        "UPDATE" => parse_update(&sql)?,
        "DELETE" => parse_delete(&sql)?,
        _ => parse_ddl(&sql)?,
    };

    for caps in WHERE
        .captures_iter(&sql)
        .chain(JOIN_CONDITION.captures_iter(&sql))
    {
        query.add_conditions(&caps[1]);
    }

    if is_prose_word(&query.target) {
        return None;
    }
    if is_sentence_case(&written) && !has_statement_structure(&keyword, &sql) {
        return None;
    }
    Some(query.finish())
}

fn is_prose_word(word: &str) -> bool {
    PROSE_WORDS.contains(&word.to_ascii_lowercase().as_str())
}

/// `Select`, `Delete`: capitalised like a sentence rather than SQL.
fn is_sentence_case(keyword: &str) -> bool {
    keyword != keyword.to_ascii_uppercase() && keyword != keyword.to_ascii_lowercase()
}

/// A full stop or exclamation mark outside quoted values ends a sentence.
fn has_sentence_punctuation(sql: &str) -> bool {
    let bytes = sql.trim_end().as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        matches!(b, b'.' | b'!') && bytes.get(i + 1).is_none_or(|n| n.is_ascii_whitespace())
    })
}

/// Clauses real queries carry that short UI sentences do not.
fn has_statement_structure(keyword: &str, sql: &str) -> bool {
    let clause = STATEMENT_CLAUSE.is_match(sql);
    match keyword {
        "SELECT" => clause || SELECT.captures(sql).is_some_and(|c| c[1].contains([',', '*'])),
        "DELETE" => sql.contains(['=', '<', '>', '?']) && clause,
        _ => true,
    }
}

/// Table aliases and per-table column evidence while one statement is parsed.
struct QueryBuilder {
    kind: StatementKind,
    target: String,
    aliases: BTreeMap<String, String>,
    columns: BTreeMap<String, BTreeSet<String>>,
    equality: BTreeMap<String, BTreeSet<String>>,
}

impl QueryBuilder {
    fn new(kind: StatementKind, table: &str, alias: Option<&str>) -> Option<Self> {
        let target = table_name(table)?;
        let mut builder = Self {
            kind,
            target: target.clone(),
            aliases: BTreeMap::new(),
            columns: BTreeMap::new(),
            equality: BTreeMap::new(),
        };
        builder.columns.insert(target.clone(), BTreeSet::new());
        builder.register(table, alias);
        Some(builder)
    }

    fn register(&mut self, table: &str, alias: Option<&str>) {
        let Some(name) = table_name(table) else { return };
        self.aliases.insert(name.to_ascii_lowercase(), name.clone());
        self.aliases
            .insert(table.trim().to_ascii_lowercase(), name.clone());
        if let Some(alias) = alias.filter(|a| !is_keyword(a)) {
            self.aliases.insert(alias.to_ascii_lowercase(), name.clone());
        }
        self.columns.entry(name).or_default();
    }

    /// Resolve `alias.column` or a bare column to (table, column).
    fn resolve(&self, reference: &str) -> Option<(String, String)> {
        let reference = reference.trim();
        let (prefix, column) = match reference.rsplit_once('.') {
            Some((prefix, column)) => (Some(prefix), column),
            None => (None, reference),
        };
        if !is_column_name(column) {
            return None;
        }
        let table = match prefix {
            Some(prefix) => self
                .aliases
                .get(&prefix.to_ascii_lowercase())
                .cloned()
                .unwrap_or_else(|| self.target.clone()),
            None => self.target.clone(),
        };
        Some((table, column.to_string()))
    }

    fn add_column(&mut self, reference: &str) {
        if let Some((table, column)) = self.resolve(reference) {
            self.columns.entry(table).or_default().insert(column);
        }
    }

    fn add_column_list(&mut self, list: &str) {
        for item in split_top_level(list) {
            if let Some(reference) = select_item_column(item) {
                self.add_column(reference);
            }
        }
    }

    fn add_assignments(&mut self, list: &str) {
        for item in split_top_level(list) {
            if let Some((lhs, _)) = item.split_once('=') {
                self.add_column(lhs);
            }
        }
    }

    fn add_conditions(&mut self, clause: &str) {
        let bytes = clause.as_bytes();
        for caps in CONDITION_COLUMN.captures_iter(clause) {
            let Some(name) = caps.get(1) else { continue };
            if name.start() > 0 && matches!(bytes[name.start() - 1], b'$' | b':' | b'@' | b'.') {
                continue;
            }
            let Some((table, column)) = self.resolve(name.as_str()) else {
                continue;
            };
            if &caps[2] == "=" {
                self.equality
                    .entry(table.clone())
                    .or_default()
                    .insert(column.clone());
            }
            self.columns.entry(table).or_default().insert(column);
        }
        for caps in QUALIFIED_OPERAND.captures_iter(clause) {
            self.add_column(&caps[1]);
        }
    }

    fn finish(mut self) -> QueryRecord {
        let referenced_columns = self.columns.remove(&self.target).unwrap_or_default();
        QueryRecord {
            line: 0,
            kind: self.kind,
            target_table: self.target,
            referenced_columns,
            joined_tables: self.columns,
            equality_filters: self.equality,
            snippet: String::new(),
        }
    }
}

fn parse_select(sql: &str) -> Option<QueryBuilder> {
    let caps = SELECT.captures(sql)?;
    let mut sources = split_top_level(&caps[2]).into_iter().filter_map(table_with_alias);
    let (table, alias) = sources.next()?;
    let mut query = QueryBuilder::new(StatementKind::Select, table, alias)?;
    for (table, alias) in sources {
        query.register(table, alias);
    }
    for join in JOIN.captures_iter(sql) {
        query.register(&join[1], join.get(2).map(|m| m.as_str()));
    }
    if split_top_level(&caps[1])
        .into_iter()
        .filter_map(select_item_column)
        .any(is_prose_word)
    {
        return None;
    }
    query.add_column_list(&caps[1]);
    Some(query)
}

fn parse_insert(sql: &str) -> Option<QueryBuilder> {
    let caps = INSERT.captures(sql)?;
    let kind = if caps[1].eq_ignore_ascii_case("INSERT") {
        StatementKind::Insert
    } else {
        StatementKind::Other
    };
    let mut query = QueryBuilder::new(kind, &caps[2], None)?;
    if let Some(columns) = caps.get(3) {
        query.add_column_list(columns.as_str());
    }
    if let Some(assignments) = caps.get(4) {
        query.add_assignments(assignments.as_str());
    }
    Some(query)
}

fn parse_update(sql: &str) -> Option<QueryBuilder> {
    let caps = UPDATE.captures(sql)?;
    let mut query = QueryBuilder::new(StatementKind::Update, &caps[1], caps.get(2).map(|m| m.as_str()))?;
    query.add_assignments(&caps[3]);
    Some(query)
}

fn parse_delete(sql: &str) -> Option<QueryBuilder> {
    let caps = DELETE.captures(sql)?;
    QueryBuilder::new(StatementKind::Delete, &caps[1], caps.get(2).map(|m| m.as_str()))
}

fn parse_ddl(sql: &str) -> Option<QueryBuilder> {
    let caps = DDL.captures(sql)?;
    let mut query = QueryBuilder::new(StatementKind::Other, &caps[2], None)?;
    let is_create = caps[1].to_ascii_uppercase().starts_with("CREATE");
    if let (true, Some(definitions)) = (is_create, caps.get(4)) {
        for definition in split_top_level(definitions.as_str()) {
            let Some(first) = definition.split_whitespace().next() else {
                continue;
            };
            if !TABLE_CONSTRAINTS.contains(&first.to_ascii_lowercase().as_str()) {
                query.add_column(first);
            }
        }
    }
    Some(query)
}

/// Column named by one select-list or insert-list item, if any.
fn select_item_column(item: &str) -> Option<&str> {
    let item = item.trim();
    if item.is_empty() || item.contains('(') || item.ends_with('*') {
        return None;
    }
    item.split_whitespace().next()
}

/// `table alias`, `table AS alias` or `table`, from a FROM-list item.
fn table_with_alias(item: &str) -> Option<(&str, Option<&str>)> {
    let mut words = item.split_whitespace();
    let table = words.next()?;
    let alias = match words.next() {
        Some(word) if word.eq_ignore_ascii_case("AS") => words.next(),
        other => other,
    };
    Some((table, alias))
}

/// Bare table name from a possibly schema-qualified reference.
fn table_name(reference: &str) -> Option<String> {
    let name = reference.trim().rsplit('.').next()?;
    is_column_name(name).then(|| name.to_string())
}

fn is_column_name(word: &str) -> bool {
    let mut chars = word.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !is_keyword(word)
}

/// Split on commas outside parentheses.
fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, b) in list.bytes().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::lex;
    use pretty_assertions::assert_eq;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_select_with_where() {
        let q = parse_statement("SELECT name FROM users WHERE status = 'active'").unwrap();
        assert_eq!(q.kind, StatementKind::Select);
        assert_eq!(q.target_table, "users");
        assert_eq!(q.referenced_columns, set(&["name", "status"]));
        assert_eq!(q.equality_filters["users"], set(&["status"]));
    }

    #[test]
    fn test_select_aliases_and_joins() {
        let q = parse_statement(
            "SELECT u.name, o.total AS t, COUNT(*) FROM users u \
             LEFT JOIN orders AS o ON o.user_id = u.id \
             WHERE u.status IN (1, 2) AND o.created_at > NOW() ORDER BY o.total",
        )
        .unwrap();
        assert_eq!(q.referenced_columns, set(&["id", "name", "status"]));
        assert_eq!(q.joined_tables["orders"], set(&["created_at", "total", "user_id"]));
        assert_eq!(q.equality_filters["orders"], set(&["user_id"]));
    }

    #[test]
    fn test_insert_forms() {
        let q = parse_statement("INSERT INTO logs (user_id, message, created) VALUES (?, ?, NOW())").unwrap();
        assert_eq!(q.kind, StatementKind::Insert);
        assert_eq!(q.referenced_columns, set(&["created", "message", "user_id"]));

        let q = parse_statement("INSERT INTO logs SET user_id = 3, message = 'x'").unwrap();
        assert_eq!(q.referenced_columns, set(&["message", "user_id"]));

        let q = parse_statement("REPLACE INTO cache (k, v) VALUES (?, ?)").unwrap();
        assert_eq!(q.kind, StatementKind::Other);
        assert_eq!(q.target_table, "cache");
    }

    #[test]
    fn test_update_and_delete() {
        let q = parse_statement("UPDATE users SET email = ?, last_login = NOW() WHERE id = ?").unwrap();
        assert_eq!(q.kind, StatementKind::Update);
        assert_eq!(q.referenced_columns, set(&["email", "id", "last_login"]));

        let q = parse_statement("DELETE FROM sessions WHERE expires < ? OR user_id IS NULL").unwrap();
        assert_eq!(q.kind, StatementKind::Delete);
        assert_eq!(q.referenced_columns, set(&["expires", "user_id"]));
    }

    #[test]
    fn test_create_table_columns() {
        let q = parse_statement(
            "CREATE TABLE IF NOT EXISTS products (id INT NOT NULL, sku VARCHAR(32), PRIMARY KEY (id))",
        )
        .unwrap();
        assert_eq!(q.kind, StatementKind::Other);
        assert_eq!(q.referenced_columns, set(&["id", "sku"]));
    }

    #[test]
    fn test_keywords_and_values_are_not_columns() {
        let q = parse_statement(
            "SELECT id FROM t WHERE NOT deleted = 1 AND note LIKE 'a = b' AND flag IS NOT NULL",
        )
        .unwrap();
        assert_eq!(q.referenced_columns, set(&["deleted", "flag", "id", "note"]));
    }

    #[test]
    fn test_unrecognised_candidates_are_dropped() {
        assert!(parse_statement("SELECT 1").is_none());
        assert!(parse_statement("Update your profile now").is_none());
    }

    #[test]
    fn test_ui_sentences_are_not_queries() {
        assert!(parse_statement("Delete from cart").is_none());
        assert!(parse_statement("Select your country from the list").is_none());
        assert!(parse_statement("Select a plan from the menu below.").is_none());
        assert!(parse_statement("DELETE FROM the basket").is_none());
        assert!(parse_statement("Select items from cart!").is_none());

        let q = parse_statement("Select name, email From users").unwrap();
        assert_eq!(q.target_table, "users");
        let q = parse_statement("delete from sessions").unwrap();
        assert_eq!(q.kind, StatementKind::Delete);
        let q = parse_statement("SELECT u.name FROM users u WHERE u.id = ?").unwrap();
        assert_eq!(q.referenced_columns, set(&["id", "name"]));
    }

    #[test]
    fn test_extract_stitches_concatenation() {
        let src = "<?php\n$sql = \"SELECT name, email FROM \" . 'users' . \" WHERE id = \" . (int) $id . \" AND active = 1\";\n";
        let queries = extract_queries(&lex(src), 200, 100);
        assert_eq!(queries.len(), 1);
        let q = &queries[0];
        assert_eq!(q.line, 2);
        assert_eq!(q.target_table, "users");
        assert_eq!(q.referenced_columns, set(&["active", "email", "id", "name"]));
        assert!(q.snippet.starts_with("SELECT name, email FROM users WHERE id = ?"));
    }

    #[test]
    fn test_extract_respects_cap_and_ignores_comments() {
        let src = "<?php\n// \"SELECT a FROM commented\"\n$a = 'SELECT x FROM t1'; $b = 'SELECT y FROM t2';\n";
        let queries = extract_queries(&lex(src), 200, 1);
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].target_table, "t1");
    }
}
