// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content-hashed handoff packages written before context rotation.

use crate::hash::{canonical_json, sha256_hex};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One unresolved acceptance criterion carried across a rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAcceptanceItem {
    pub step_id: String,
    pub criterion: String,
}

/// Accepted / failed / pending partition of the plan's steps.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StepStatusBuckets {
    pub accepted: Vec<String>,
    pub failed: Vec<String>,
    pub pending: Vec<String>,
}

/// The self-contained resume record (`handoff_package.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffPackage {
    pub schema_version: String,
    pub task_id: String,
    pub run_id: String,
    pub current_step: Option<String>,
    pub open_acceptance_items: Vec<OpenAcceptanceItem>,
    pub evidence_paths: Vec<String>,
    pub next_action: String,
    pub resumable_step_ids: Vec<String>,
    pub skipped_step_ids: Vec<String>,
    pub step_status: StepStatusBuckets,
    pub created_at: DateTime<Utc>,
    pub package_hash: String,
}

impl HandoffPackage {
    /// SHA-256 over the canonical serialization of every field except the
    /// hash itself. Any modification to the package invalidates it.
    pub fn compute_hash(payload: &Value) -> String {
        let material = match payload {
            Value::Object(map) => {
                let mut trimmed = map.clone();
                trimmed.remove("package_hash");
                Value::Object(trimmed)
            }
            other => other.clone(),
        };
        sha256_hex(canonical_json(&material).as_bytes())
    }

    /// Recompute the hash from this package's own fields.
    pub fn expected_hash(&self) -> Result<String, serde_json::Error> {
        let value = serde_json::to_value(self)?;
        Ok(Self::compute_hash(&value))
    }
}
