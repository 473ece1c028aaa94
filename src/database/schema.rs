//! Corpus-wide table evidence.
//!
//! A [`TableSchema`] only ever grows: merging is a set union for columns and
//! operations and a sum for counters, so any fold order gives the same result.
//! Column roles are derived from the merged counters, never accumulated.

use super::query::{QueryRecord, StatementKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    PrimaryKeyLike,
    ForeignKeyLike,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub column_roles: BTreeMap<String, ColumnRole>,
    /// Number of queries using each column as an `=` filter.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub equality_filter_counts: BTreeMap<String, usize>,
    pub query_count: usize,
    pub operations: BTreeSet<StatementKind>,
}

impl TableSchema {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Self::default()
        }
    }

    /// Union `other` into `self`. Commutative and associative.
    pub fn merge(&mut self, other: &TableSchema) {
        debug_assert_eq!(self.table_name, other.table_name);
        self.columns.extend(other.columns.iter().cloned());
        self.operations.extend(other.operations.iter().copied());
        for (column, count) in &other.equality_filter_counts {
            *self.equality_filter_counts.entry(column.clone()).or_default() += count;
        }
        self.query_count += other.query_count;
    }

    /// Recompute `column_roles` from the merged evidence.
    pub fn assign_roles(&mut self, primary_key_min_filters: usize) {
        self.column_roles = self
            .columns
            .iter()
            .filter_map(|column| {
                let role = column_role(
                    column,
                    self.equality_filter_counts.get(column).copied().unwrap_or(0),
                    primary_key_min_filters,
                )?;
                Some((column.clone(), role))
            })
            .collect();
    }
}

fn column_role(column: &str, filter_count: usize, min_filters: usize) -> Option<ColumnRole> {
    let lower = column.to_ascii_lowercase();
    if lower.len() > 3 && lower.ends_with("_id") {
        Some(ColumnRole::ForeignKeyLike)
    } else if lower == "id" || filter_count >= min_filters {
        Some(ColumnRole::PrimaryKeyLike)
    } else {
        None
    }
}

/// Partial schemas for the queries of one file.
pub fn schemas_from_queries<'q>(
    queries: impl IntoIterator<Item = &'q QueryRecord>,
) -> BTreeMap<String, TableSchema> {
    let mut tables: BTreeMap<String, TableSchema> = BTreeMap::new();
    for query in queries {
        for (table, columns) in query.table_columns() {
            let schema = tables
                .entry(table.to_string())
                .or_insert_with(|| TableSchema::new(table));
            schema.columns.extend(columns.iter().cloned());
            schema.operations.insert(query.kind);
            schema.query_count += 1;
            if let Some(filters) = query.equality_filters.get(table) {
                for column in filters {
                    *schema.equality_filter_counts.entry(column.clone()).or_default() += 1;
                }
            }
        }
    }
    tables
}

/// Fold one partial schema map into an accumulator.
pub fn merge_schemas(into: &mut BTreeMap<String, TableSchema>, from: &BTreeMap<String, TableSchema>) {
    for (name, schema) in from {
        into.entry(name.clone())
            .or_insert_with(|| TableSchema::new(name.clone()))
            .merge(schema);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::query::parse_statement;

    fn partial(sqls: &[&str]) -> BTreeMap<String, TableSchema> {
        let queries: Vec<_> = sqls.iter().filter_map(|s| parse_statement(s)).collect();
        schemas_from_queries(&queries)
    }

    #[test]
    fn test_schema_accumulates_union() {
        let tables = partial(&[
            "SELECT name FROM users WHERE status = 'active'",
            "UPDATE users SET email = ? WHERE id = ?",
        ]);
        let users = &tables["users"];
        let columns: Vec<_> = users.columns.iter().map(String::as_str).collect();
        assert_eq!(columns, vec!["email", "id", "name", "status"]);
        assert_eq!(users.query_count, 2);
        assert_eq!(
            users.operations,
            [StatementKind::Select, StatementKind::Update].into_iter().collect()
        );
    }

    #[test]
    fn test_merge_is_order_independent() {
        let a = partial(&["SELECT a FROM t WHERE k = 1"]);
        let b = partial(&["SELECT b FROM t WHERE k = 2", "DELETE FROM u WHERE x = 1"]);
        let c = partial(&["INSERT INTO t (c) VALUES (?)"]);

        let mut forward = BTreeMap::new();
        for part in [&a, &b, &c] {
            merge_schemas(&mut forward, part);
        }
        let mut shuffled = BTreeMap::new();
        for part in [&c, &a, &b] {
            merge_schemas(&mut shuffled, part);
        }
        assert_eq!(forward, shuffled);
        assert_eq!(forward["t"].equality_filter_counts["k"], 2);
    }

    #[test]
    fn test_roles_from_merged_counts() {
        let mut tables = partial(&[
            "SELECT a FROM orders WHERE code = ?",
            "SELECT b FROM orders WHERE code = ? AND customer_id = ?",
            "SELECT c FROM orders WHERE id = ? AND status = 1",
        ]);
        let orders = tables.get_mut("orders").unwrap();
        orders.assign_roles(2);
        assert_eq!(orders.column_roles["code"], ColumnRole::PrimaryKeyLike);
        assert_eq!(orders.column_roles["id"], ColumnRole::PrimaryKeyLike);
        assert_eq!(orders.column_roles["customer_id"], ColumnRole::ForeignKeyLike);
        assert!(!orders.column_roles.contains_key("status"));
    }
}
