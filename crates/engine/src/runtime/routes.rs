// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conditional routing: given a node and the (already mutated) working
//! ledger, pick one of the node's allowed targets.

use daokit_core::{guard_transition, NodeName, OrchestratorStatus, TaskRun, TransitionError};

/// One routing decision, with the trace fields recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    pub route_id: String,
    pub target: OrchestratorStatus,
    pub reason: &'static str,
    pub predicate: &'static str,
}

impl RouteDecision {
    fn new(
        node: NodeName,
        current: OrchestratorStatus,
        target: OrchestratorStatus,
        reason: &'static str,
        predicate: &'static str,
    ) -> Self {
        Self {
            route_id: format!(
                "{node}:{}->{}",
                current.as_str().to_lowercase(),
                target.as_str().to_lowercase()
            ),
            target,
            reason,
            predicate,
        }
    }
}

/// Count of rework rounds recorded so far.
pub(crate) fn rework_attempts(state: &TaskRun) -> u32 {
    state
        .role_lifecycle
        .get("rework:attempts")
        .and_then(|raw| raw.trim().parse::<u32>().ok())
        .unwrap_or(0)
}

pub(crate) fn rework_pending(state: &TaskRun) -> bool {
    state.role_lifecycle.get("acceptance") == Some("rework")
}

/// Resolve the target status for a node, validated against the
/// allowed-transition table.
pub fn resolve_route(
    node: NodeName,
    current: OrchestratorStatus,
    state: &TaskRun,
    max_rework_attempts: u32,
) -> Result<RouteDecision, TransitionError> {
    let (_, default_target) = node.transition();
    let decision = match node {
        NodeName::Verify if rework_pending(state) && rework_attempts(state) > max_rework_attempts => {
            // The rework ladder is exhausted; drain instead of looping.
            RouteDecision::new(
                node,
                current,
                OrchestratorStatus::Draining,
                "rework_budget_exhausted",
                "rework_attempts_exceeded",
            )
        }
        NodeName::Verify if rework_pending(state) => RouteDecision::new(
            node,
            current,
            default_target,
            "acceptance_rework_recorded",
            "acceptance_failed",
        ),
        NodeName::Transition if rework_pending(state) => RouteDecision::new(
            node,
            current,
            OrchestratorStatus::Execute,
            "rework_directive_pending",
            "acceptance_rework",
        ),
        _ => RouteDecision::new(node, current, default_target, "deterministic", "always"),
    };

    guard_transition(current, decision.target, node.as_str())?;
    Ok(decision)
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
