// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handoff package store: write a hashed resume package before context
//! rotation, verify and reconcile it against the live ledger afterwards.

use chrono::{DateTime, Utc};
use daokit_core::{
    Clock, HandoffPackage, OpenAcceptanceItem, StepStatusBuckets, TaskRun, SCHEMA_VERSION,
};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Handoff package failures.
#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("handoff package is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("expected handoff package file at '{0}'")]
    NotAFile(PathBuf),

    #[error("handoff package does not exist at '{0}'")]
    Missing(PathBuf),

    #[error("handoff package field '{name}' is missing or empty")]
    InvalidField { name: &'static str },

    #[error("handoff package hash validation failed")]
    HashMismatch,

    #[error("{field} mismatch between ledger and handoff package")]
    IdMismatch { field: &'static str },
}

/// Structured outcome of applying a package to the live ledger.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct HandoffResumePlan {
    pub task_id: String,
    pub run_id: String,
    pub resume_step_id: Option<String>,
    pub resumable_step_ids: Vec<String>,
    pub skipped_step_ids: Vec<String>,
    pub open_acceptance_items: Vec<OpenAcceptanceItem>,
    pub next_action: String,
    pub package_path: String,
    pub loaded_at: DateTime<Utc>,
}

/// Persists and restores deterministic rotation handoff packages.
pub struct HandoffStore<C: Clock> {
    package_path: PathBuf,
    clock: C,
}

impl<C: Clock> HandoffStore<C> {
    pub fn new(package_path: impl Into<PathBuf>, clock: C) -> Self {
        Self { package_path: package_path.into(), clock }
    }

    pub fn package_path(&self) -> &Path {
        &self.package_path
    }

    /// Build and persist the resume package from the ledger.
    pub fn write_package(
        &self,
        ledger: &TaskRun,
        evidence_paths: Option<&[String]>,
        include_accepted_steps: bool,
    ) -> Result<HandoffPackage, HandoffError> {
        let task_id = require_id(ledger.task_id.as_deref(), "task_id")?;
        let run_id = require_id(ledger.run_id.as_deref(), "run_id")?;

        let order = step_order(ledger);
        let buckets = classify_steps(ledger, &order);
        let resumable = resumable_steps(&order, &buckets.accepted, include_accepted_steps);
        let skipped: Vec<String> =
            order.iter().filter(|id| !resumable.contains(*id)).cloned().collect();
        let resume_step = pick_resume_step(ledger.current_step.as_deref(), None, &resumable);

        let open_acceptance_items = collect_open_acceptance_items(ledger, &resumable);
        let evidence_paths = match evidence_paths {
            Some(paths) => dedupe_trimmed(paths),
            None => collect_expected_outputs(ledger, &resumable),
        };
        let next_action =
            if resume_step.is_none() { "complete".to_string() } else { "resume".to_string() };

        let mut package = HandoffPackage {
            schema_version: SCHEMA_VERSION.to_string(),
            task_id,
            run_id,
            current_step: resume_step,
            open_acceptance_items,
            evidence_paths,
            next_action,
            resumable_step_ids: resumable,
            skipped_step_ids: skipped,
            step_status: buckets,
            created_at: self.clock.now_utc(),
            package_hash: String::new(),
        };
        package.package_hash = package.expected_hash()?;

        if let Some(parent) = self.package_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut body = serde_json::to_vec_pretty(&package)?;
        body.push(b'\n');
        fs::write(&self.package_path, body)?;
        Ok(package)
    }

    /// Load and verify the package. `Ok(None)` when the file is absent;
    /// tampering or missing fields are typed errors.
    pub fn load_package(&self) -> Result<Option<HandoffPackage>, HandoffError> {
        if !self.package_path.exists() {
            return Ok(None);
        }
        if !self.package_path.is_file() {
            return Err(HandoffError::NotAFile(self.package_path.clone()));
        }

        let body = fs::read_to_string(&self.package_path)?;
        let raw: Value = serde_json::from_str(&body)?;
        let package: HandoffPackage = serde_json::from_value(raw.clone())?;
        validate_package(&package)?;

        if package.package_hash != HandoffPackage::compute_hash(&raw) {
            return Err(HandoffError::HashMismatch);
        }
        Ok(Some(package))
    }

    /// Reconcile the package with the live ledger and mark the resume plan
    /// in `role_lifecycle`. The live ledger wins wherever it has steps.
    pub fn apply_package(
        &self,
        ledger: &mut TaskRun,
        include_accepted_steps: bool,
    ) -> Result<HandoffResumePlan, HandoffError> {
        let package = self
            .load_package()?
            .ok_or_else(|| HandoffError::Missing(self.package_path.clone()))?;

        match ledger.task_id.as_deref() {
            Some(task_id) if task_id != package.task_id => {
                return Err(HandoffError::IdMismatch { field: "task_id" });
            }
            Some(_) => {}
            None => ledger.task_id = Some(package.task_id.clone()),
        }
        match ledger.run_id.as_deref() {
            Some(run_id) if run_id != package.run_id => {
                return Err(HandoffError::IdMismatch { field: "run_id" });
            }
            Some(_) => {}
            None => ledger.run_id = Some(package.run_id.clone()),
        }

        let order = step_order(ledger);
        let buckets = classify_steps(ledger, &order);
        let mut resumable = resumable_steps(&order, &buckets.accepted, include_accepted_steps);
        let mut skipped: Vec<String> =
            order.iter().filter(|id| !resumable.contains(*id)).cloned().collect();

        let mut resume_step = pick_resume_step(
            ledger.current_step.as_deref(),
            package.current_step.as_deref(),
            &resumable,
        );
        if resume_step.is_none() {
            // The live ledger has nothing to resume; fall back to the
            // package's own resumable set.
            resume_step = package.resumable_step_ids.first().cloned();
            if resumable.is_empty() && !package.resumable_step_ids.is_empty() {
                resumable = package.resumable_step_ids.clone();
                skipped = Vec::new();
            }
        }

        let mut open_acceptance_items = collect_open_acceptance_items(ledger, &resumable);
        if open_acceptance_items.is_empty() {
            open_acceptance_items = package.open_acceptance_items.clone();
        }

        let mut next_action =
            if resume_step.is_none() { "complete".to_string() } else { "resume".to_string() };
        if resume_step.is_some() && !package.next_action.trim().is_empty() {
            next_action = package.next_action.clone();
        }

        ledger.current_step = resume_step.clone();
        let lifecycle = &mut ledger.role_lifecycle;
        lifecycle.set("handoff_resume_step", resume_step.clone().unwrap_or_else(|| "none".to_string()));
        lifecycle.set("handoff_next_action", next_action.clone());
        lifecycle.set("handoff_resumable_steps", resumable.join(","));
        lifecycle.set("handoff_skipped_steps", skipped.join(","));
        lifecycle.set(
            "handoff_failed_steps",
            intersect(&buckets.failed, &resumable).join(","),
        );
        lifecycle.set(
            "handoff_pending_steps",
            intersect(&buckets.pending, &resumable).join(","),
        );

        Ok(HandoffResumePlan {
            task_id: package.task_id,
            run_id: package.run_id,
            resume_step_id: resume_step,
            resumable_step_ids: resumable,
            skipped_step_ids: skipped,
            open_acceptance_items,
            next_action,
            package_path: self.package_path.to_string_lossy().replace('\\', "/"),
            loaded_at: self.clock.now_utc(),
        })
    }
}

fn require_id(value: Option<&str>, name: &'static str) -> Result<String, HandoffError> {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(HandoffError::InvalidField { name }),
    }
}

fn validate_package(package: &HandoffPackage) -> Result<(), HandoffError> {
    if package.schema_version.trim().is_empty() {
        return Err(HandoffError::InvalidField { name: "schema_version" });
    }
    if package.task_id.trim().is_empty() {
        return Err(HandoffError::InvalidField { name: "task_id" });
    }
    if package.run_id.trim().is_empty() {
        return Err(HandoffError::InvalidField { name: "run_id" });
    }
    if let Some(step) = package.current_step.as_deref() {
        if step.trim().is_empty() {
            return Err(HandoffError::InvalidField { name: "current_step" });
        }
    }
    if package.next_action.trim().is_empty() {
        return Err(HandoffError::InvalidField { name: "next_action" });
    }
    if package.package_hash.trim().is_empty() {
        return Err(HandoffError::InvalidField { name: "package_hash" });
    }
    for item in &package.open_acceptance_items {
        if item.step_id.trim().is_empty() {
            return Err(HandoffError::InvalidField { name: "open_acceptance_items.step_id" });
        }
        if item.criterion.trim().is_empty() {
            return Err(HandoffError::InvalidField { name: "open_acceptance_items.criterion" });
        }
    }
    Ok(())
}

/// Ordered unique step ids from the ledger.
fn step_order(ledger: &TaskRun) -> Vec<String> {
    let mut seen = HashSet::new();
    ledger
        .steps
        .iter()
        .filter(|step| !step.id.trim().is_empty())
        .filter(|step| seen.insert(step.id.clone()))
        .map(|step| step.id.clone())
        .collect()
}

fn classify_steps(ledger: &TaskRun, order: &[String]) -> StepStatusBuckets {
    let mut buckets = StepStatusBuckets::default();
    for step_id in order {
        match classify_lifecycle(ledger.role_lifecycle.step(step_id)) {
            StepClass::Accepted => buckets.accepted.push(step_id.clone()),
            StepClass::Failed => buckets.failed.push(step_id.clone()),
            StepClass::Pending => buckets.pending.push(step_id.clone()),
        }
    }
    buckets
}

enum StepClass {
    Accepted,
    Failed,
    Pending,
}

const ACCEPTED_MARKERS: [&str; 5] = ["accepted", "done", "completed", "passed", "verified"];

fn classify_lifecycle(value: Option<&str>) -> StepClass {
    let Some(raw) = value else {
        return StepClass::Pending;
    };
    let normalized = raw.trim().to_lowercase();
    if normalized.is_empty() {
        return StepClass::Pending;
    }

    for marker in ACCEPTED_MARKERS {
        if normalized == marker
            || normalized.starts_with(&format!("{marker}_"))
            || normalized.starts_with(&format!("{marker}-"))
        {
            return StepClass::Accepted;
        }
    }
    if normalized.contains("failed") || normalized == "error" || normalized == "blocked" {
        return StepClass::Failed;
    }
    StepClass::Pending
}

fn resumable_steps(order: &[String], accepted: &[String], include_accepted: bool) -> Vec<String> {
    if include_accepted {
        return order.to_vec();
    }
    let accepted: HashSet<&String> = accepted.iter().collect();
    order.iter().filter(|id| !accepted.contains(*id)).cloned().collect()
}

fn pick_resume_step(
    ledger_current: Option<&str>,
    package_current: Option<&str>,
    resumable: &[String],
) -> Option<String> {
    if let Some(current) = ledger_current {
        if resumable.iter().any(|id| id == current) {
            return Some(current.to_string());
        }
    }
    if let Some(current) = package_current {
        if resumable.iter().any(|id| id == current) {
            return Some(current.to_string());
        }
    }
    resumable.first().cloned()
}

fn collect_open_acceptance_items(ledger: &TaskRun, resumable: &[String]) -> Vec<OpenAcceptanceItem> {
    let resumable: HashSet<&String> = resumable.iter().collect();
    let mut items = Vec::new();
    for step in &ledger.steps {
        if !resumable.contains(&step.id) {
            continue;
        }
        for criterion in &step.acceptance_criteria {
            let trimmed = criterion.trim();
            if trimmed.is_empty() {
                continue;
            }
            items.push(OpenAcceptanceItem {
                step_id: step.id.clone(),
                criterion: trimmed.to_string(),
            });
        }
    }
    items
}

fn collect_expected_outputs(ledger: &TaskRun, resumable: &[String]) -> Vec<String> {
    let resumable: HashSet<&String> = resumable.iter().collect();
    let mut seen = HashSet::new();
    let mut outputs = Vec::new();
    for step in &ledger.steps {
        if !resumable.contains(&step.id) {
            continue;
        }
        for output in &step.expected_outputs {
            let trimmed = output.trim();
            if trimmed.is_empty() || !seen.insert(trimmed.to_string()) {
                continue;
            }
            outputs.push(trimmed.to_string());
        }
    }
    outputs
}

fn dedupe_trimmed(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .filter(|value| seen.insert(value.clone()))
        .collect()
}

fn intersect(values: &[String], keep: &[String]) -> Vec<String> {
    let keep: HashSet<&String> = keep.iter().collect();
    values.iter().filter(|value| keep.contains(*value)).cloned().collect()
}

#[cfg(test)]
#[path = "handoff_tests.rs"]
mod tests;
