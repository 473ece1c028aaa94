//! Crash reporting and per-thread analysis context.
//!
//! ```ignore
//! use legacymap::observability::{install_panic_hook, set_current_file, set_phase, AnalysisPhase};
//!
//! install_panic_hook();
//! let _phase = set_phase(AnalysisPhase::FileAnalysis);
//! for file in files {
//!     let _file = set_current_file(&file);
//!     // a panic here reports the phase and file
//! }
//! ```

pub mod context;
pub mod panic_hook;

pub use context::{
    get_current_context, get_progress, increment_processed, set_current_file,
    set_current_function, set_phase, set_phase_persistent, set_progress, AnalysisContext,
    AnalysisPhase, ContextGuard,
};
pub use panic_hook::install_panic_hook;
