//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code in the core and the terminal host MUST NOT
//! sleep. The frame loop waits on input polls; background work waits on
//! channels and futures.
//! **Exception**: Frame rate limiting in `runtime/core/src/timing.rs`.
//! Test modules are not scanned.

use std::path::Path;

use architectural_enforcement::{context_mentions, report, scan, CodeLine};

/// The one file allowed to sleep
const PACER: &str = "runtime/core/src/timing.rs";

fn is_sleep(line: &CodeLine<'_>) -> bool {
    line.code.contains("::sleep(") || line.code.contains(".sleep(")
}

fn is_frame_limiting(path: &Path, lines: &[CodeLine<'_>], idx: usize) -> bool {
    path.ends_with(PACER) && context_mentions(lines, idx, 5, "frame")
}

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let violations = scan(&["runtime/core/src", "tui/src"], |path, lines, idx| {
        is_sleep(&lines[idx]) && !is_frame_limiting(path, lines, idx)
    });

    report(
        "Sleep calls found in production code!",
        &violations,
        &[
            "✅ ACCEPTABLE: frame rate limiting in FramePacer::wait",
            "❌ FORBIDDEN: sleeping in hooks, tasks or polling loops",
            "   (poll input with a timeout, or submit work to the task bridge)",
        ],
    );
}

/// The pacer really is where the frame loop sleeps
#[test]
fn test_frame_pacer_sleeps() {
    let found = scan(&["runtime/core/src"], |path, lines, idx| {
        is_sleep(&lines[idx]) && is_frame_limiting(path, lines, idx)
    });
    assert_eq!(found.len(), 1, "expected exactly one frame limiting sleep: {found:?}");
}
