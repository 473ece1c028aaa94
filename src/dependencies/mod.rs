pub mod graph;
pub mod includes;

pub use graph::{build_dependency_graph, DependencyGraph};
pub use includes::{extract_includes, DependencyEdge, IncludeKind, IncludeTarget};
