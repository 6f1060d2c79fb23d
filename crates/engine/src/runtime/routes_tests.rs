// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;

fn ledger() -> TaskRun {
    TaskRun::bootstrap(Utc::now())
}

#[test]
fn nodes_route_to_their_default_targets() {
    let state = ledger();
    for (node, from, to) in [
        (NodeName::Extract, OrchestratorStatus::Planning, OrchestratorStatus::Analysis),
        (NodeName::Plan, OrchestratorStatus::Analysis, OrchestratorStatus::Freeze),
        (NodeName::Dispatch, OrchestratorStatus::Freeze, OrchestratorStatus::Execute),
        (NodeName::Verify, OrchestratorStatus::Execute, OrchestratorStatus::Accept),
        (NodeName::Transition, OrchestratorStatus::Accept, OrchestratorStatus::Done),
    ] {
        let route = resolve_route(node, from, &state, 1).unwrap();
        assert_eq!(route.target, to);
        assert_eq!(route.predicate, "always");
    }
}

#[test]
fn transition_reroutes_to_execute_on_pending_rework() {
    let mut state = ledger();
    state.role_lifecycle.set("acceptance", "rework");
    let route = resolve_route(NodeName::Transition, OrchestratorStatus::Accept, &state, 1).unwrap();
    assert_eq!(route.target, OrchestratorStatus::Execute);
    assert_eq!(route.reason, "rework_directive_pending");
    assert_eq!(route.route_id, "transition:accept->execute");
}

#[test]
fn verify_drains_when_the_rework_budget_is_exhausted() {
    let mut state = ledger();
    state.role_lifecycle.set("acceptance", "rework");
    state.role_lifecycle.set("rework:attempts", "2");
    let route = resolve_route(NodeName::Verify, OrchestratorStatus::Execute, &state, 1).unwrap();
    assert_eq!(route.target, OrchestratorStatus::Draining);
    assert_eq!(route.reason, "rework_budget_exhausted");

    // Inside the budget, verify still routes forward to ACCEPT.
    state.role_lifecycle.set("rework:attempts", "1");
    let route = resolve_route(NodeName::Verify, OrchestratorStatus::Execute, &state, 1).unwrap();
    assert_eq!(route.target, OrchestratorStatus::Accept);
}

#[test]
fn malformed_attempt_counters_read_as_zero() {
    let mut state = ledger();
    state.role_lifecycle.set("rework:attempts", "soon");
    assert_eq!(rework_attempts(&state), 0);
}
