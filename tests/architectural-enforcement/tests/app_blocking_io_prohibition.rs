//! Integration Test: Blocking I/O Prohibition in Apps
//!
//! **Policy**: Built-in apps and the launcher run on the frame loop. They
//! MUST NOT touch the network, files or processes directly; that work goes
//! through `Context::submit` / `Context::submit_async`.
//!
//! Weather HTTP lives in a `WeatherSource` whose futures the task bridge
//! runs, so `reqwest` (async) is fine; `reqwest::blocking` is not.

use architectural_enforcement::{report, scan};

const FORBIDDEN: &[&str] = &[
    "std::fs",
    "std::net",
    "std::process::Command",
    "reqwest::blocking",
    "File::open",
    "File::create",
    "read_to_string(",
    "TcpStream",
];

/// Test that app code does not do blocking I/O
#[test]
fn test_no_blocking_io_in_apps() {
    let violations = scan(&["tui/src/apps", "tui/src/launcher.rs"], |_, lines, idx| {
        FORBIDDEN.iter().any(|f| lines[idx].code.contains(f))
    });

    report(
        "Blocking I/O found in app code!",
        &violations,
        &[
            "✅ REQUIRED: cx.submit(work, callback) for blocking work",
            "✅ REQUIRED: cx.submit_async(future, callback) for network calls",
        ],
    );
}
