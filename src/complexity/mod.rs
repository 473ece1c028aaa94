pub mod cyclomatic;

pub use cyclomatic::{calculate_cyclomatic, count_branches, BranchBreakdown};
