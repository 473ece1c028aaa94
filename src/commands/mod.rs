//! CLI command implementations.
//!
//! - **analyze**: build the corpus model for a source tree and write it
//! - **init**: write a default `.legacymap.toml`

pub mod analyze;
pub mod init;

pub use analyze::{handle_analyze, AnalyzeConfig, AnalyzeReport};
pub use init::init_config;
