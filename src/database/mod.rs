pub mod query;
pub mod schema;

pub use query::{extract_queries, parse_statement, QueryRecord, StatementKind};
pub use schema::{merge_schemas, schemas_from_queries, ColumnRole, TableSchema};
