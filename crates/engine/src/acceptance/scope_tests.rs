// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use yare::parameterized;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

#[parameterized(
    plain = { "src/lib.rs", "src/lib.rs" },
    backslashes = { "src\\exec\\mod.rs", "src/exec/mod.rs" },
    dot_segments = { "./src/./lib.rs", "src/lib.rs" },
    trailing_padding = { "  docs/guide.md  ", "docs/guide.md" },
)]
fn relative_paths_normalize(input: &str, expected: &str) {
    assert_eq!(normalize_relative_path(input, "path").unwrap(), expected);
}

#[test]
fn absolute_and_traversing_paths_are_rejected() {
    assert!(matches!(
        normalize_relative_path("/etc/passwd", "path"),
        Err(ScopeError::AbsolutePath { .. })
    ));
    assert!(matches!(
        normalize_relative_path("../secrets.txt", "path"),
        Err(ScopeError::ParentTraversal { .. })
    ));
    assert!(matches!(
        normalize_relative_path("  ", "path"),
        Err(ScopeError::EmptyEntry { .. })
    ));
    assert!(matches!(normalize_relative_path("./.", "path"), Err(ScopeError::NoSegments { .. })));
}

#[test]
fn directory_scopes_keep_their_trailing_slash() {
    let scope = normalize_scope(&strings(&["src/", "README.md", "src/"])).unwrap();
    assert_eq!(scope, strings(&["src/", "README.md"]));
}

#[parameterized(
    inside_dir = { "src/exec/mod.rs", true },
    exact_file = { "README.md", true },
    file_as_prefix_dir = { "README.md/extra", true },
    outside = { "docs/guide.md", false },
    sibling_prefix = { "src2/main.rs", false },
)]
fn scope_matching(path: &str, expected: bool) {
    let scope = strings(&["src/", "README.md"]);
    assert_eq!(path_is_allowed(path, &scope).unwrap(), expected);
}

#[test]
fn audit_reports_violations_in_order() {
    let audit = audit_changed_files(
        &strings(&["src/a.rs", "docs/x.md", "src/b.rs", "secrets/key.pem"]),
        &strings(&["src/"]),
    )
    .unwrap();
    assert!(!audit.passed());
    assert_eq!(audit.violating_files, strings(&["docs/x.md", "secrets/key.pem"]));
}

#[test]
fn audit_dedupes_changed_files() {
    let audit =
        audit_changed_files(&strings(&["src/a.rs", "src/./a.rs"]), &strings(&["src/"])).unwrap();
    assert_eq!(audit.changed_files, strings(&["src/a.rs"]));
    assert!(audit.passed());
}

#[test]
fn empty_scope_is_rejected() {
    assert!(matches!(audit_changed_files(&strings(&["a.rs"]), &[]), Err(ScopeError::EmptyScope)));
}

#[test]
fn audit_summary_renders_pass_and_fail() {
    let passing = audit_changed_files(&strings(&["src/a.rs"]), &strings(&["src/"])).unwrap();
    let summary = build_audit_summary(&passing, "DKT-1", "S1");
    assert!(summary.contains("# Audit Summary"));
    assert!(summary.contains("PASS: all changed files are inside allowed scope."));
    assert!(summary.contains("- (none)"));

    let failing = audit_changed_files(&strings(&["other/b.rs"]), &strings(&["src/"])).unwrap();
    let summary = build_audit_summary(&failing, "DKT-1", "S1");
    assert!(summary.contains("FAIL: found violating files outside allowed scope."));
    assert!(summary.contains("- `other/b.rs`"));
}

proptest! {
    /// Normalization is idempotent on its own output.
    #[test]
    fn normalization_is_idempotent(segments in proptest::collection::vec("[a-z]{1,8}", 1..5)) {
        let path = segments.join("/");
        let once = normalize_relative_path(&path, "path").unwrap();
        let twice = normalize_relative_path(&once, "path").unwrap();
        prop_assert_eq!(once, twice);
    }

    /// A file under a directory scope is always allowed.
    #[test]
    fn files_under_directory_scope_are_allowed(
        dir in "[a-z]{1,8}",
        file in "[a-z]{1,8}\\.rs",
    ) {
        let scope = vec![format!("{dir}/")];
        let path = format!("{dir}/{file}");
        prop_assert!(path_is_allowed(&path, &scope).unwrap());
    }
}
