// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stable failure / adoption reason vocabulary.
//!
//! Silence reasons (`NO_OUTPUT_<duration>`) are built dynamically by
//! [`crate::heartbeat::silence_reason_code`]; everything else is fixed.

use serde::{Deserialize, Serialize};

/// Fixed reason codes attached to acceptance, lease, and succession records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    MissingEvidence,
    MissingCommandEvidence,
    InvalidEvidencePath,
    OutOfScopeChange,
    ScopeAuditInputIncomplete,
    ScopeAuditInputInvalid,
    LeaseNotAdopted,
    ValidUnexpiredLease,
    HeartbeatStale,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::MissingEvidence => "MISSING_EVIDENCE",
            ReasonCode::MissingCommandEvidence => "MISSING_COMMAND_EVIDENCE",
            ReasonCode::InvalidEvidencePath => "INVALID_EVIDENCE_PATH",
            ReasonCode::OutOfScopeChange => "OUT_OF_SCOPE_CHANGE",
            ReasonCode::ScopeAuditInputIncomplete => "SCOPE_AUDIT_INPUT_INCOMPLETE",
            ReasonCode::ScopeAuditInputInvalid => "SCOPE_AUDIT_INPUT_INVALID",
            ReasonCode::LeaseNotAdopted => "LEASE_NOT_ADOPTED",
            ReasonCode::ValidUnexpiredLease => "VALID_UNEXPIRED_LEASE",
            ReasonCode::HeartbeatStale => "HEARTBEAT_STALE",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
