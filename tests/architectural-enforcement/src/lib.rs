//! Architectural Enforcement Integration Tests
//!
//! Source-scanning tests that keep the workspace honest:
//! - No sleep() outside the frame pacer
//! - Apps never do blocking I/O on the frame loop
//! - The core stays free of terminal dependencies
//!
//! This library holds the shared scanning helpers; the rules live under
//! `tests/`.

use std::fs;
use std::path::{Path, PathBuf};

/// Workspace root (two levels above this crate)
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// One offending source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File, relative to the workspace root
    pub file: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// Trimmed source text
    pub text: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.file.display(), self.line, self.text)
    }
}

/// A production source line, with its comment stripped
#[derive(Debug, Clone)]
pub struct CodeLine<'a> {
    /// 1-based line number
    pub number: usize,
    /// Code before any `//`
    pub code: &'a str,
    /// The full original line
    pub raw: &'a str,
}

/// All `.rs` files under `dir` (relative to the workspace root)
#[must_use]
pub fn rust_files(dir: &str) -> Vec<PathBuf> {
    let root = workspace_root().join(dir);
    if !root.exists() {
        return Vec::new();
    }
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(|e| e.into_path())
        .collect()
}

/// Production lines of `content`
///
/// Stops at the first `#[cfg(test)]`: test modules sit at the bottom of
/// each file.
#[must_use]
pub fn production_lines(content: &str) -> Vec<CodeLine<'_>> {
    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| !line.trim_start().starts_with("#[cfg(test)]"))
        .map(|(idx, line)| CodeLine {
            number: idx + 1,
            code: line.split("//").next().unwrap_or(line),
            raw: line,
        })
        .collect()
}

/// Scan every production line under `dirs` with `check`
///
/// `check` gets the file path, the file's production lines and the index of
/// the line under test, and returns whether that line is a violation.
pub fn scan<F>(dirs: &[&str], mut check: F) -> Vec<Violation>
where
    F: FnMut(&Path, &[CodeLine<'_>], usize) -> bool,
{
    let root = workspace_root();
    let mut violations = Vec::new();

    for dir in dirs {
        for path in rust_files(dir) {
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            let lines = production_lines(&content);
            for idx in 0..lines.len() {
                if check(&path, &lines, idx) {
                    violations.push(Violation {
                        file: path.strip_prefix(&root).unwrap_or(&path).to_path_buf(),
                        line: lines[idx].number,
                        text: lines[idx].raw.trim().to_string(),
                    });
                }
            }
        }
    }
    violations
}

/// Whether any line within `before` lines above `idx` mentions `needle`
#[must_use]
pub fn context_mentions(lines: &[CodeLine<'_>], idx: usize, before: usize, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    lines[idx.saturating_sub(before)..=idx]
        .iter()
        .any(|l| l.raw.to_lowercase().contains(&needle))
}

/// Print violations in the standard format and panic if there are any
///
/// # Panics
///
/// Panics when `violations` is not empty.
pub fn report(title: &str, violations: &[Violation], advice: &[&str]) {
    if violations.is_empty() {
        return;
    }
    eprintln!("\n❌ CRITICAL: {title}\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    if !advice.is_empty() {
        eprintln!();
        for line in advice {
            eprintln!("  {line}");
        }
    }
    panic!(
        "\nFound {} violation(s): {title}\nFix these before merging!",
        violations.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let src = "fn a() {}\n// note\n#[cfg(test)]\nmod tests {}\n";
        let lines = production_lines(src);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].code, "");
    }

    #[test]
    fn test_comments_are_stripped() {
        let lines = production_lines("let x = 1; // sleep(1)");
        assert_eq!(lines[0].code, "let x = 1; ");
    }

    #[test]
    fn test_workspace_root_has_manifest() {
        assert!(workspace_root().join("Cargo.toml").exists());
        assert!(!rust_files("runtime/core/src").is_empty());
    }
}
