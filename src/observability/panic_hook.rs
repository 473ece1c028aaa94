//! Crash report printed to stderr when analysis panics.
//!
//! The report names the phase, file and function the panicking thread was
//! working on, so a user can attach the offending source file.

use super::context::{get_current_context, get_progress, AnalysisContext};
use crate::utils::truncate_chars;
use std::panic::PanicHookInfo;
use tracing::Span;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const RULE: &str = "================================================================================";

pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        print_crash_report(info);
    }));
}

fn print_crash_report(info: &PanicHookInfo<'_>) {
    let context = get_current_context();
    let (processed, total) = get_progress();

    eprintln!();
    eprintln!("{RULE}");
    eprintln!("legacymap crash report");
    eprintln!("{RULE}");
    for line in report_lines(
        &extract_panic_message(info),
        info.location().map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column())),
        &context,
        processed,
        total,
    ) {
        eprintln!("  {line}");
    }
    if let Some(metadata) = Span::current().metadata() {
        eprintln!("  span: {}", metadata.name());
    }
    eprintln!("{RULE}");
    if std::env::var("RUST_BACKTRACE").is_ok() {
        eprintln!("{}", std::backtrace::Backtrace::capture());
    } else {
        eprintln!("Run with RUST_BACKTRACE=1 for a stack trace");
    }
    if let Some(file) = &context.current_file {
        eprintln!("Include the file {} when reporting this crash", file.display());
    }
}

fn report_lines(
    message: &str,
    location: Option<String>,
    context: &AnalysisContext,
    processed: usize,
    total: usize,
) -> Vec<String> {
    let mut lines = vec![
        format!("version: {VERSION} ({})", std::env::consts::OS),
        format!("time: {}", chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")),
        format!("panic: {}", truncate_chars(message, 200)),
    ];
    if let Some(location) = location {
        lines.push(format!("location: {location}"));
    }
    lines.push(match context.phase {
        Some(phase) => format!("phase: {phase}"),
        None => "phase: (not set, crash before analysis started)".to_string(),
    });
    if let Some(file) = &context.current_file {
        lines.push(format!("file: {}", file.display()));
    }
    if let Some(function) = &context.current_function {
        lines.push(format!("function: {function}"));
    }
    if total > 0 {
        let pct = (processed as f64 / total as f64 * 100.0) as usize;
        lines.push(format!("progress: {processed} / {total} files ({pct}%)"));
    }
    lines
}

fn extract_panic_message(info: &PanicHookInfo<'_>) -> String {
    if let Some(s) = info.payload().downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::AnalysisPhase;
    use std::path::PathBuf;

    #[test]
    fn test_report_includes_context() {
        let context = AnalysisContext {
            phase: Some(AnalysisPhase::FileAnalysis),
            current_file: Some(PathBuf::from("shop/cart.php")),
            current_function: Some("Cart::total".into()),
        };
        let lines = report_lines("boom", Some("src/x.rs:1:1".into()), &context, 5, 20);
        assert!(lines.contains(&"panic: boom".to_string()));
        assert!(lines.contains(&"phase: file_analysis".to_string()));
        assert!(lines.contains(&"file: shop/cart.php".to_string()));
        assert!(lines.contains(&"function: Cart::total".to_string()));
        assert!(lines.contains(&"progress: 5 / 20 files (25%)".to_string()));
    }

    #[test]
    fn test_report_without_phase() {
        let lines = report_lines("early", None, &AnalysisContext::new(), 0, 0);
        assert!(lines.iter().any(|l| l.starts_with("phase: (not set")));
        assert!(!lines.iter().any(|l| l.starts_with("progress")));
    }
}
