// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Acceptance engine: evidence-backed step certification and the change
//! scope audit.

mod engine;
mod scope;

pub use engine::{evaluate_step, AcceptanceError, StepEvaluation};
pub use scope::{
    audit_changed_files, build_audit_summary, normalize_relative_path, normalize_scope,
    path_is_allowed, DiffAudit, ScopeError,
};
