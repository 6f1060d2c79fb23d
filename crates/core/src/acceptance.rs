// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Acceptance decision records: proofs, criterion results, evidence, rework.

use crate::hash::{canonical_json, sha256_hex};
use crate::reason::ReasonCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceptanceStatus {
    Passed,
    Failed,
}

impl AcceptanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcceptanceStatus::Passed => "passed",
            AcceptanceStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for AcceptanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One expected-output artifact as inspected under the evidence root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub output_name: String,
    pub path: String,
    pub exists: bool,
    pub sha256: Option<String>,
    pub size_bytes: Option<u64>,
}

/// Pass/fail verdict for a single acceptance criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionResult {
    pub criterion_id: String,
    pub criterion: String,
    pub passed: bool,
    pub reason_codes: Vec<ReasonCode>,
}

/// A structured failure with its stable code and diagnostic details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReason {
    pub code: ReasonCode,
    pub message: String,
    pub details: Value,
}

/// Content-addressed proof of an acceptance evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptanceProof {
    pub proof_id: String,
    pub status: AcceptanceStatus,
    pub task_id: String,
    pub run_id: String,
    pub step_id: String,
    pub criteria: Vec<CriterionResult>,
    pub evidence: Vec<EvidenceRecord>,
}

/// A failed criterion echoed back in the rework payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReworkCriterion {
    pub criterion_id: String,
    pub criterion: String,
    pub reason_codes: Vec<ReasonCode>,
}

/// Directives telling the executor how to repair a failed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReworkPayload {
    pub next_action: String,
    pub step_id: String,
    pub failed_criteria: Vec<ReworkCriterion>,
    pub directives: Vec<String>,
}

/// The full outcome of one acceptance evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptanceDecision {
    pub status: AcceptanceStatus,
    pub proof: AcceptanceProof,
    pub failure_reasons: Vec<FailureReason>,
    pub rework: Option<ReworkPayload>,
}

impl AcceptanceDecision {
    pub fn passed(&self) -> bool {
        self.status == AcceptanceStatus::Passed
    }
}

/// Derive the deterministic proof id: `proof-` plus the first 16 hex chars
/// of SHA-256 over the canonical proof payload.
pub fn stable_proof_id(payload: &Value) -> String {
    let digest = sha256_hex(canonical_json(payload).as_bytes());
    format!("proof-{}", &digest[..16])
}
