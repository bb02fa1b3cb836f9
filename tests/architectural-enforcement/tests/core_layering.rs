//! Integration Test: Core Layering
//!
//! **Policy**: `matrixos-core` is headless. It MUST NOT depend on ratatui,
//! crossterm or any HTTP client, and MUST NOT know about the terminal host
//! or its apps. Devices come in through the `Surface` and `InputSource`
//! traits.

use std::fs;

use architectural_enforcement::{report, scan, workspace_root};

const TERMINAL_CRATES: &[&str] = &["ratatui", "crossterm", "reqwest"];

/// Test that the core manifest has no terminal or HTTP dependencies
#[test]
fn test_core_manifest_is_headless() {
    let manifest = fs::read_to_string(workspace_root().join("runtime/core/Cargo.toml"))
        .expect("core manifest readable");

    let offending: Vec<&str> = TERMINAL_CRATES
        .iter()
        .copied()
        .filter(|krate| {
            manifest.lines().any(|l| {
                l.trim_start()
                    .strip_prefix(krate)
                    .is_some_and(|rest| rest.starts_with([' ', '=', '.']))
            })
        })
        .collect();

    assert!(
        offending.is_empty(),
        "❌ runtime/core/Cargo.toml depends on {offending:?}; devices belong in the host crate"
    );
}

/// Test that core sources never name the host's crates
#[test]
fn test_core_sources_are_headless() {
    let violations = scan(&["runtime/core/src"], |_, lines, idx| {
        let code = lines[idx].code;
        TERMINAL_CRATES
            .iter()
            .any(|krate| code.contains(&format!("{krate}::")))
            || code.contains("matrixos_tui")
    });

    report(
        "Terminal or host references found in matrixos-core!",
        &violations,
        &["✅ REQUIRED: implement Surface / InputSource in the host crate instead"],
    );
}

/// Test that only the device modules of the host talk to crossterm
#[test]
fn test_apps_do_not_touch_the_terminal() {
    let violations = scan(&["tui/src/apps", "tui/src/launcher.rs", "tui/src/draw.rs"], |_, lines, idx| {
        let code = lines[idx].code;
        code.contains("crossterm::") || code.contains("ratatui::")
    });

    report(
        "Apps reaching past the Surface trait!",
        &violations,
        &["✅ REQUIRED: draw through &mut dyn Surface"],
    );
}
