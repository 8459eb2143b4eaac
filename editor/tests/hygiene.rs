//! Hygiene: enforces coding standards at test time.
//!
//! These tests scan the editor crate's production sources for patterns that
//! crash the host, silently drop errors, or block the async runtime. Each
//! pattern has a budget of zero; fix the code rather than raising it.

use std::fs;
use std::path::{Path, PathBuf};

struct SourceFile {
    path: PathBuf,
    content: String,
}

/// Production `.rs` files under `src/`, skipping `*_test.rs`.
fn source_files() -> Vec<SourceFile> {
    let mut files = Vec::new();
    collect_rs_files(Path::new("src"), &mut files);
    assert!(!files.is_empty(), "no sources found; run from the editor crate root");
    files
}

fn collect_rs_files(dir: &Path, out: &mut Vec<SourceFile>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rs_files(&path, out);
            continue;
        }
        let is_rs = path.extension().is_some_and(|e| e == "rs");
        let is_test = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().ends_with("_test.rs"));
        if is_rs && !is_test {
            if let Ok(content) = fs::read_to_string(&path) {
                out.push(SourceFile { path, content });
            }
        }
    }
}

/// Lines containing `pattern`, as `path:line` strings.
fn hits(files: &[SourceFile], pattern: &str) -> Vec<String> {
    files
        .iter()
        .flat_map(|file| {
            file.content
                .lines()
                .enumerate()
                .filter(|(_, line)| line.contains(pattern))
                .map(|(n, _)| format!("  {}:{}", file.path.display(), n + 1))
                .collect::<Vec<_>>()
        })
        .collect()
}

fn assert_absent(pattern: &str, why: &str) {
    let found = hits(&source_files(), pattern);
    assert!(
        found.is_empty(),
        "`{pattern}` is not allowed in production code ({why}); found {}:\n{}",
        found.len(),
        found.join("\n")
    );
}

// =============================================================================
// Panics
// =============================================================================

#[test]
fn no_unwrap() {
    assert_absent(".unwrap()", "propagate or recover instead");
}

#[test]
fn no_expect() {
    assert_absent(".expect(", "propagate or recover instead");
}

#[test]
fn no_panic_macros() {
    for pattern in ["panic!(", "unreachable!(", "todo!(", "unimplemented!("] {
        assert_absent(pattern, "a panic in the editor loses unsaved work");
    }
}

// =============================================================================
// Silent loss
// =============================================================================

#[test]
fn no_silent_discard() {
    assert_absent("let _ =", "log or handle the result");
}

#[test]
fn no_dot_ok() {
    assert_absent(".ok()", "match on the error instead of dropping it");
}

// =============================================================================
// Runtime
// =============================================================================

#[test]
fn no_blocking_sleep() {
    assert_absent("std::thread::sleep", "timers must be tokio timers");
}

#[test]
fn no_print_macros() {
    for pattern in ["println!(", "eprintln!(", "dbg!("] {
        assert_absent(pattern, "use tracing");
    }
}

#[test]
fn no_allow_dead_code() {
    assert_absent("#[allow(dead_code)]", "delete unused code");
}
