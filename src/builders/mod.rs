pub mod corpus;
pub mod summary;

pub use corpus::CorpusBuilder;
pub use summary::{complexity_summary, migration_assessment, security_summary, ENTRY_POINT_THRESHOLD};
