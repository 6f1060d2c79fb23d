// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change scope audit: relative-POSIX path policy for changed files.

use thiserror::Error;

/// Scope policy input violations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScopeError {
    #[error("{name} must be a non-empty string")]
    EmptyEntry { name: String },

    #[error("{name} must be a relative path: {path}")]
    AbsolutePath { name: String, path: String },

    #[error("{name} cannot contain parent traversal: {path}")]
    ParentTraversal { name: String, path: String },

    #[error("{name} must contain at least one path segment")]
    NoSegments { name: String },

    #[error("allowed_scope must contain at least one entry")]
    EmptyScope,
}

/// Outcome of auditing changed files against an allowed scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffAudit {
    pub allowed_scope: Vec<String>,
    pub changed_files: Vec<String>,
    pub violating_files: Vec<String>,
}

impl DiffAudit {
    pub fn passed(&self) -> bool {
        self.violating_files.is_empty()
    }
}

/// Normalize to a relative POSIX path: back-slashes unified, `.` segments
/// dropped, absolute paths and `..` traversal rejected.
pub fn normalize_relative_path(path: &str, name: &str) -> Result<String, ScopeError> {
    let raw = path.trim();
    if raw.is_empty() {
        return Err(ScopeError::EmptyEntry { name: name.to_string() });
    }
    let unified = raw.replace('\\', "/");
    if unified.starts_with('/') {
        return Err(ScopeError::AbsolutePath { name: name.to_string(), path: path.to_string() });
    }

    let mut parts = Vec::new();
    for part in unified.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                return Err(ScopeError::ParentTraversal {
                    name: name.to_string(),
                    path: path.to_string(),
                });
            }
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return Err(ScopeError::NoSegments { name: name.to_string() });
    }
    Ok(parts.join("/"))
}

/// Normalize one scope entry, preserving the trailing `/` that marks a
/// directory scope.
fn normalize_scope_entry(entry: &str, name: &str) -> Result<String, ScopeError> {
    let raw = entry.trim();
    if raw.is_empty() {
        return Err(ScopeError::EmptyEntry { name: name.to_string() });
    }
    let is_directory = raw.ends_with('/');
    let normalized = normalize_relative_path(raw, name)?;
    if is_directory {
        Ok(format!("{normalized}/"))
    } else {
        Ok(normalized)
    }
}

/// Normalize and dedupe a scope list, preserving order.
pub fn normalize_scope(allowed_scope: &[String]) -> Result<Vec<String>, ScopeError> {
    let mut seen = std::collections::HashSet::new();
    let mut normalized = Vec::new();
    for (index, entry) in allowed_scope.iter().enumerate() {
        let item = normalize_scope_entry(entry, &format!("allowed_scope[{index}]"))?;
        if seen.insert(item.clone()) {
            normalized.push(item);
        }
    }
    if normalized.is_empty() {
        return Err(ScopeError::EmptyScope);
    }
    Ok(normalized)
}

fn matches_scope(path: &str, scope_entry: &str) -> bool {
    if let Some(dir) = scope_entry.strip_suffix('/') {
        return path.starts_with(&format!("{dir}/"));
    }
    path == scope_entry || path.starts_with(&format!("{scope_entry}/"))
}

/// Whether a changed path falls inside any allowed scope entry.
pub fn path_is_allowed(path: &str, allowed_scope: &[String]) -> Result<bool, ScopeError> {
    let normalized_path = normalize_relative_path(path, "changed_files entry")?;
    let normalized_scope = normalize_scope(allowed_scope)?;
    Ok(normalized_scope.iter().any(|entry| matches_scope(&normalized_path, entry)))
}

/// Audit every changed file against the allowed scope.
pub fn audit_changed_files(
    changed_files: &[String],
    allowed_scope: &[String],
) -> Result<DiffAudit, ScopeError> {
    let normalized_scope = normalize_scope(allowed_scope)?;

    let mut seen = std::collections::HashSet::new();
    let mut normalized_changed = Vec::new();
    for (index, item) in changed_files.iter().enumerate() {
        let path = normalize_relative_path(item, &format!("changed_files[{index}]"))?;
        if seen.insert(path.clone()) {
            normalized_changed.push(path);
        }
    }

    let violating: Vec<String> = normalized_changed
        .iter()
        .filter(|path| !normalized_scope.iter().any(|entry| matches_scope(path, entry)))
        .cloned()
        .collect();

    Ok(DiffAudit {
        allowed_scope: normalized_scope,
        changed_files: normalized_changed,
        violating_files: violating,
    })
}

/// Render a markdown audit summary for operator reports.
pub fn build_audit_summary(result: &DiffAudit, task_id: &str, step_id: &str) -> String {
    let mut lines = vec![
        "# Audit Summary".to_string(),
        format!("- task_id: {task_id}"),
        format!("- step_id: {step_id}"),
        String::new(),
        "## Allowed Scope".to_string(),
    ];
    lines.extend(result.allowed_scope.iter().map(|entry| format!("- `{entry}`")));

    lines.push(String::new());
    lines.push("## Changed Files".to_string());
    lines.extend(result.changed_files.iter().map(|entry| format!("- `{entry}`")));

    lines.push(String::new());
    lines.push("## Result".to_string());
    if result.passed() {
        lines.push("PASS: all changed files are inside allowed scope.".to_string());
    } else {
        lines.push("FAIL: found violating files outside allowed scope.".to_string());
    }

    lines.push(String::new());
    lines.push("### Violating Files".to_string());
    if result.violating_files.is_empty() {
        lines.push("- (none)".to_string());
    } else {
        lines.extend(result.violating_files.iter().map(|entry| format!("- `{entry}`")));
    }

    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
#[path = "scope_tests.rs"]
mod tests;
