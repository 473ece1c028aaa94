//! Thread-local analysis context for crash reports.
//!
//! Each rayon worker keeps its own phase/file/function triple; the file
//! counters are global atomics shared by every worker.

use std::cell::RefCell;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

static FILES_PROCESSED: AtomicUsize = AtomicUsize::new(0);
static FILES_TOTAL: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static CURRENT_CONTEXT: RefCell<AnalysisContext> = const { RefCell::new(AnalysisContext::new()) };
}

/// What the current thread was doing.
#[derive(Debug, Clone, Default)]
pub struct AnalysisContext {
    pub phase: Option<AnalysisPhase>,
    pub current_file: Option<PathBuf>,
    /// Function or `Class::method` being analyzed
    pub current_function: Option<String>,
}

impl AnalysisContext {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: None,
            current_file: None,
            current_function: None,
        }
    }
}

/// Stages of a corpus run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPhase {
    /// Walking the root and matching extensions
    FileDiscovery,
    /// Reading and transcoding file bytes
    Reading,
    /// Per-file extraction
    FileAnalysis,
    /// Folding file results into the corpus model
    Aggregation,
    /// Writing the report
    OutputGeneration,
}

impl std::fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileDiscovery => write!(f, "file_discovery"),
            Self::Reading => write!(f, "reading"),
            Self::FileAnalysis => write!(f, "file_analysis"),
            Self::Aggregation => write!(f, "aggregation"),
            Self::OutputGeneration => write!(f, "output_generation"),
        }
    }
}

/// Restores the previous context when dropped, so guards nest.
pub struct ContextGuard {
    previous: AnalysisContext,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CURRENT_CONTEXT.with(|ctx| {
            *ctx.borrow_mut() = self.previous.clone();
        });
    }
}

fn update(apply: impl FnOnce(&mut AnalysisContext)) -> ContextGuard {
    CURRENT_CONTEXT.with(|ctx| {
        let previous = ctx.borrow().clone();
        apply(&mut ctx.borrow_mut());
        ContextGuard { previous }
    })
}

#[must_use]
pub fn set_phase(phase: AnalysisPhase) -> ContextGuard {
    update(|ctx| ctx.phase = Some(phase))
}

/// Sets the phase with no guard; it stays until the next call.
pub fn set_phase_persistent(phase: AnalysisPhase) {
    CURRENT_CONTEXT.with(|ctx| {
        ctx.borrow_mut().phase = Some(phase);
    });
}

#[must_use]
pub fn set_current_file(path: impl Into<PathBuf>) -> ContextGuard {
    let path = path.into();
    update(|ctx| {
        ctx.current_file = Some(path);
        ctx.current_function = None;
    })
}

#[must_use]
pub fn set_current_function(name: impl Into<String>) -> ContextGuard {
    let name = name.into();
    update(|ctx| ctx.current_function = Some(name))
}

pub fn set_progress(processed: usize, total: usize) {
    FILES_PROCESSED.store(processed, Ordering::Relaxed);
    FILES_TOTAL.store(total, Ordering::Relaxed);
}

pub fn increment_processed() {
    FILES_PROCESSED.fetch_add(1, Ordering::Relaxed);
}

#[must_use]
pub fn get_current_context() -> AnalysisContext {
    CURRENT_CONTEXT.with(|ctx| ctx.borrow().clone())
}

/// (processed, total)
#[must_use]
pub fn get_progress() -> (usize, usize) {
    (
        FILES_PROCESSED.load(Ordering::Relaxed),
        FILES_TOTAL.load(Ordering::Relaxed),
    )
}

#[cfg(test)]
fn reset_context() {
    CURRENT_CONTEXT.with(|ctx| {
        *ctx.borrow_mut() = AnalysisContext::new();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_guard_restores_previous() {
        reset_context();

        let _outer = set_phase(AnalysisPhase::FileAnalysis);
        {
            let _inner = set_phase(AnalysisPhase::Aggregation);
            assert_eq!(get_current_context().phase, Some(AnalysisPhase::Aggregation));
        }
        assert_eq!(get_current_context().phase, Some(AnalysisPhase::FileAnalysis));
    }

    #[test]
    fn test_new_file_clears_function() {
        reset_context();

        let _file = set_current_file("legacy/a.php");
        let _func = set_current_function("Cart::total");
        assert_eq!(
            get_current_context().current_function.as_deref(),
            Some("Cart::total")
        );
        {
            let _next = set_current_file("legacy/b.php");
            let ctx = get_current_context();
            assert_eq!(ctx.current_file, Some(PathBuf::from("legacy/b.php")));
            assert!(ctx.current_function.is_none());
        }
        assert_eq!(
            get_current_context().current_function.as_deref(),
            Some("Cart::total")
        );
    }

    #[test]
    fn test_progress_counters() {
        set_progress(0, 10);
        increment_processed();
        increment_processed();
        let (processed, total) = get_progress();
        assert!(processed >= 2);
        assert_eq!(total, 10);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(AnalysisPhase::FileDiscovery.to_string(), "file_discovery");
        assert_eq!(AnalysisPhase::OutputGeneration.to_string(), "output_generation");
    }
}
