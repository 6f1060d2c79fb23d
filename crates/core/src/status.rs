// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator status machine: statuses, the allowed-transition table, and
//! the deterministic node → (source, target) mapping.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle status of a task run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrchestratorStatus {
    Planning,
    Analysis,
    Freeze,
    Execute,
    Accept,
    Done,
    Draining,
    Blocked,
    Failed,
}

impl OrchestratorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrchestratorStatus::Planning => "PLANNING",
            OrchestratorStatus::Analysis => "ANALYSIS",
            OrchestratorStatus::Freeze => "FREEZE",
            OrchestratorStatus::Execute => "EXECUTE",
            OrchestratorStatus::Accept => "ACCEPT",
            OrchestratorStatus::Done => "DONE",
            OrchestratorStatus::Draining => "DRAINING",
            OrchestratorStatus::Blocked => "BLOCKED",
            OrchestratorStatus::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> Result<Self, TransitionError> {
        match value.trim() {
            "PLANNING" => Ok(OrchestratorStatus::Planning),
            "ANALYSIS" => Ok(OrchestratorStatus::Analysis),
            "FREEZE" => Ok(OrchestratorStatus::Freeze),
            "EXECUTE" => Ok(OrchestratorStatus::Execute),
            "ACCEPT" => Ok(OrchestratorStatus::Accept),
            "DONE" => Ok(OrchestratorStatus::Done),
            "DRAINING" => Ok(OrchestratorStatus::Draining),
            "BLOCKED" => Ok(OrchestratorStatus::Blocked),
            "FAILED" => Ok(OrchestratorStatus::Failed),
            other => Err(TransitionError::UnknownStatus { value: other.to_string() }),
        }
    }

    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrchestratorStatus::Done | OrchestratorStatus::Failed)
    }
}

impl std::fmt::Display for OrchestratorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allowed targets from a given status.
pub fn allowed_targets(status: OrchestratorStatus) -> &'static [OrchestratorStatus] {
    use OrchestratorStatus::*;
    match status {
        Planning => &[Analysis],
        Analysis => &[Freeze],
        Freeze => &[Execute],
        Execute => &[Accept, Draining],
        Accept => &[Done, Execute],
        Draining => &[Execute, Blocked],
        Blocked => &[Execute],
        Done | Failed => &[],
    }
}

/// The five deterministic graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeName {
    Extract,
    Plan,
    Dispatch,
    Verify,
    Transition,
}

impl NodeName {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeName::Extract => "extract",
            NodeName::Plan => "plan",
            NodeName::Dispatch => "dispatch",
            NodeName::Verify => "verify",
            NodeName::Transition => "transition",
        }
    }

    /// Expected source status and default target for this node.
    pub fn transition(&self) -> (OrchestratorStatus, OrchestratorStatus) {
        use OrchestratorStatus::*;
        match self {
            NodeName::Extract => (Planning, Analysis),
            NodeName::Plan => (Analysis, Freeze),
            NodeName::Dispatch => (Freeze, Execute),
            NodeName::Verify => (Execute, Accept),
            NodeName::Transition => (Accept, Done),
        }
    }

    pub const ALL: [NodeName; 5] = [
        NodeName::Extract,
        NodeName::Plan,
        NodeName::Dispatch,
        NodeName::Verify,
        NodeName::Transition,
    ];
}

impl std::fmt::Display for NodeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The node that consumes a given status, if the deterministic graph has one.
pub fn node_for_status(status: OrchestratorStatus) -> Option<NodeName> {
    NodeName::ALL.into_iter().find(|node| node.transition().0 == status)
}

/// Transition guard violations with the diagnostics the operator needs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("unknown orchestrator status '{value}'")]
    UnknownStatus { value: String },

    #[error(
        "illegal transition via '{trigger}': {from} -> {to}. Allowed targets from {from}: {}.",
        render_targets(.allowed)
    )]
    IllegalTransition {
        trigger: String,
        from: OrchestratorStatus,
        to: OrchestratorStatus,
        allowed: Vec<OrchestratorStatus>,
    },

    #[error(
        "node '{node}' expects source status {expected}, but ledger is at {current}. \
         Action: resume from the expected predecessor node before retrying this node."
    )]
    SourceMismatch {
        node: NodeName,
        current: OrchestratorStatus,
        expected: OrchestratorStatus,
        attempted: OrchestratorStatus,
    },

    #[error("no deterministic node mapping for status '{status}'")]
    NoNodeForStatus { status: OrchestratorStatus },
}

fn render_targets(targets: &[OrchestratorStatus]) -> String {
    if targets.is_empty() {
        return "<none>".to_string();
    }
    targets.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ")
}

/// Check a transition against the fixed table; no state is mutated on failure.
pub fn guard_transition(
    current: OrchestratorStatus,
    target: OrchestratorStatus,
    trigger: &str,
) -> Result<(), TransitionError> {
    let allowed = allowed_targets(current);
    if allowed.contains(&target) {
        return Ok(());
    }
    Err(TransitionError::IllegalTransition {
        trigger: trigger.to_string(),
        from: current,
        to: target,
        allowed: allowed.to_vec(),
    })
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
