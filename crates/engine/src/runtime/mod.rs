// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The deterministic orchestrator runtime.
//!
//! Drives the fixed node sequence extract → plan → dispatch → verify →
//! transition over the persisted ledger, one guarded transition at a time.
//! Every node execution saves the ledger (with its snapshot) and appends a
//! SYSTEM event carrying the route trace.

mod dispatch;
mod routes;

pub use routes::{resolve_route, RouteDecision};

use crate::acceptance::{evaluate_step, AcceptanceError, StepEvaluation};
use crate::runtime::dispatch::DispatchLadder;
use daokit_adapters::{DispatchAdapter, DispatchError};
use daokit_core::{
    EventDraft, EventType, NodeName, OrchestratorStatus, Severity, StepContract, TaskRun,
    TransitionError,
};
use daokit_planner::build_minimal_text_input_steps;
use daokit_storage::{StateBackend, StoreError};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_CONTROLLER_LANE: &str = "controller";
pub const DEFAULT_DISPATCH_MAX_RESUME_RETRIES: u32 = 1;
pub const DEFAULT_DISPATCH_MAX_REWORK_ATTEMPTS: u32 = 1;

/// Orchestrator runtime failures.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("acceptance error: {0}")]
    Acceptance(#[from] AcceptanceError),

    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Construction parameters for [`OrchestratorRuntime`].
pub struct RuntimeConfig<S> {
    pub task_id: String,
    pub run_id: String,
    pub goal: String,
    pub step_id: String,
    pub store: Arc<S>,
    pub dispatch_adapter: Option<Box<dyn DispatchAdapter>>,
    pub max_resume_retries: u32,
    pub max_rework_attempts: u32,
    /// When set, the verify node runs the acceptance engine against this
    /// evidence root; otherwise verification is a pass-through.
    pub evidence_root: Option<PathBuf>,
}

impl<S> RuntimeConfig<S> {
    pub fn new(
        task_id: impl Into<String>,
        run_id: impl Into<String>,
        goal: impl Into<String>,
        store: Arc<S>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            run_id: run_id.into(),
            goal: goal.into(),
            step_id: "S1".to_string(),
            store,
            dispatch_adapter: None,
            max_resume_retries: DEFAULT_DISPATCH_MAX_RESUME_RETRIES,
            max_rework_attempts: DEFAULT_DISPATCH_MAX_REWORK_ATTEMPTS,
            evidence_root: None,
        }
    }

    pub fn step_id(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = step_id.into();
        self
    }

    pub fn dispatch_adapter(mut self, adapter: Box<dyn DispatchAdapter>) -> Self {
        self.dispatch_adapter = Some(adapter);
        self
    }

    pub fn retry_limits(mut self, max_resume_retries: u32, max_rework_attempts: u32) -> Self {
        self.max_resume_retries = max_resume_retries;
        self.max_rework_attempts = max_rework_attempts;
        self
    }

    pub fn evidence_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.evidence_root = Some(root.into());
        self
    }
}

/// Deterministic orchestrator graph backed by explicit persisted state.
pub struct OrchestratorRuntime<S> {
    task_id: String,
    run_id: String,
    goal: String,
    step_id: String,
    store: Arc<S>,
    dispatch_adapter: Option<Box<dyn DispatchAdapter>>,
    max_resume_retries: u32,
    max_rework_attempts: u32,
    evidence_root: Option<PathBuf>,
}

impl<S: StateBackend> OrchestratorRuntime<S> {
    /// Build the runtime and bootstrap the ledger for this run.
    pub fn new(config: RuntimeConfig<S>) -> Result<Self, RuntimeError> {
        let runtime = Self {
            task_id: config.task_id,
            run_id: config.run_id,
            goal: config.goal,
            step_id: config.step_id,
            store: config.store,
            dispatch_adapter: config.dispatch_adapter,
            max_resume_retries: config.max_resume_retries,
            max_rework_attempts: config.max_rework_attempts,
            evidence_root: config.evidence_root,
        };
        runtime.bootstrap_ledger()?;
        Ok(runtime)
    }

    /// The live ledger; restart support is `recover_state` + `run`.
    pub fn recover_state(&self) -> Result<TaskRun, RuntimeError> {
        Ok(self.store.load_state()?)
    }

    /// Loop node execution until the run is DONE or a terminal error.
    pub fn run(&self) -> Result<TaskRun, RuntimeError> {
        loop {
            let state = self.recover_state()?;
            if state.status == OrchestratorStatus::Done {
                return Ok(state);
            }
            let node = daokit_core::node_for_status(state.status)
                .ok_or(TransitionError::NoNodeForStatus { status: state.status })?;
            self.execute(node)?;
        }
    }

    pub fn extract(&self) -> Result<TaskRun, RuntimeError> {
        self.execute(NodeName::Extract)
    }

    pub fn plan(&self) -> Result<TaskRun, RuntimeError> {
        self.execute(NodeName::Plan)
    }

    pub fn dispatch(&self) -> Result<TaskRun, RuntimeError> {
        self.execute(NodeName::Dispatch)
    }

    pub fn verify(&self) -> Result<TaskRun, RuntimeError> {
        self.execute(NodeName::Verify)
    }

    pub fn transition(&self) -> Result<TaskRun, RuntimeError> {
        self.execute(NodeName::Transition)
    }

    fn bootstrap_ledger(&self) -> Result<(), RuntimeError> {
        let mut state = self.store.load_state()?;
        let mut changed = false;

        if state.task_id.as_deref() != Some(self.task_id.as_str()) {
            state.task_id = Some(self.task_id.clone());
            changed = true;
        }
        if state.run_id.as_deref() != Some(self.run_id.as_str()) {
            state.run_id = Some(self.run_id.clone());
            changed = true;
        }
        if state.goal.trim().is_empty() {
            state.goal = self.goal.clone();
            changed = true;
        }

        let lifecycle = &mut state.role_lifecycle;
        if lifecycle.controller_lane.as_deref().map(str::trim).filter(|lane| !lane.is_empty()).is_none()
        {
            lifecycle.controller_lane = Some(DEFAULT_CONTROLLER_LANE.to_string());
            changed = true;
        }
        if lifecycle
            .controller_ownership
            .as_deref()
            .map(str::trim)
            .filter(|ownership| !ownership.is_empty())
            .is_none()
        {
            let lane = lifecycle.controller_lane.clone().unwrap_or_else(|| {
                DEFAULT_CONTROLLER_LANE.to_string()
            });
            lifecycle.controller_ownership = Some(format!("{lane}:unassigned"));
            changed = true;
        }

        if state.steps.is_empty() {
            state.steps = vec![self.default_step_contract()];
            changed = true;
        }

        if changed {
            let status = state.status;
            self.store.save_state(&state, Some("bootstrap"), None, Some(status))?;
        }
        Ok(())
    }

    /// The seed contract written when a ledger has no steps yet. The plan
    /// node replaces it with a generated plan.
    fn default_step_contract(&self) -> StepContract {
        StepContract {
            id: self.step_id.clone(),
            title: "Implement orchestrator state machine".to_string(),
            category: "implementation".to_string(),
            goal: self.goal.clone(),
            actions: vec![
                "Implement nodes extract/plan/dispatch/verify/transition".to_string(),
                "Persist state snapshots between node transitions".to_string(),
                "Add transition guards for forbidden jumps".to_string(),
            ],
            acceptance_criteria: vec![
                "Graph runs happy path end-to-end".to_string(),
                "Illegal transition attempts fail with explicit diagnostics".to_string(),
                "State is recoverable after process restart".to_string(),
            ],
            expected_outputs: vec![
                "report.md".to_string(),
                "verification.log".to_string(),
                "audit-summary.md".to_string(),
            ],
            dependencies: vec!["DKT-002".to_string()],
            planner_source: Some("bootstrap_default".to_string()),
        }
    }

    fn execute(&self, node: NodeName) -> Result<TaskRun, RuntimeError> {
        let state = self.store.load_state()?;
        let current = state.status;
        let (expected_source, default_target) = node.transition();

        if current != expected_source {
            let error = TransitionError::SourceMismatch {
                node,
                current,
                expected: expected_source,
                attempted: default_target,
            };
            self.append_route_failure_event(node, current, &state, &error)?;
            return Err(error.into());
        }

        let mut working = state.clone();
        match node {
            NodeName::Extract => self.mutate_extract(&mut working),
            NodeName::Plan => self.mutate_plan(&mut working),
            NodeName::Dispatch => self.mutate_dispatch(&mut working)?,
            NodeName::Verify => self.mutate_verify(&mut working)?,
            NodeName::Transition => self.mutate_transition(&mut working),
        }

        let route = match routes::resolve_route(node, current, &working, self.max_rework_attempts) {
            Ok(route) => route,
            Err(error) => {
                self.append_route_failure_event(node, current, &state, &error)?;
                return Err(error.into());
            }
        };

        working.status = route.target;
        let lifecycle = &mut working.role_lifecycle;
        lifecycle.set("orchestrator", format!("{node}_complete"));
        lifecycle.set("route:last_node", node.as_str());
        lifecycle.set("route:last_id", route.route_id.clone());
        lifecycle.set("route:last_reason", route.reason);
        lifecycle.set("route:last_predicate", route.predicate);
        lifecycle.set("route:last_target", route.target.as_str());

        let trace = self.append_route_trace(&mut working, &route.route_id);
        let trace_index = trace.len().saturating_sub(1);
        let trace_id = self.route_trace_id(&working);
        let correlation_id = self.route_correlation_id(&working);
        working.role_lifecycle.set("route:trace_id", trace_id.clone());
        working.role_lifecycle.set("route:trace_index", trace_index.to_string());
        working.role_lifecycle.set("route:correlation_id", correlation_id.clone());

        let saved = self.store.save_state(
            &working,
            Some(node.as_str()),
            Some(current),
            Some(route.target),
        )?;

        self.store.append_event(
            EventDraft::new(
                saved.task_id.clone().unwrap_or_else(|| self.task_id.clone()),
                saved.run_id.clone().unwrap_or_else(|| self.run_id.clone()),
                EventType::System,
                Severity::Info,
                json!({
                    "node": node,
                    "from_status": current,
                    "to_status": route.target,
                    "route_id": route.route_id,
                    "route_reason": route.reason,
                    "route_predicate": route.predicate,
                    "correlation_id": correlation_id,
                    "branch_trace_id": trace_id,
                    "branch_trace_index": trace_index,
                    "branch_trace": trace,
                }),
            )
            .step_opt(saved.current_step.clone()),
        )?;

        Ok(saved)
    }

    fn mutate_extract(&self, state: &mut TaskRun) {
        state.role_lifecycle.set("analysis", "prepared");
    }

    fn mutate_plan(&self, state: &mut TaskRun) {
        if self.should_generate_minimal_text_plan(state) {
            let goal = if state.goal.trim().is_empty() { &self.goal } else { &state.goal };
            let generated = build_minimal_text_input_steps(goal, &self.step_id);
            state.current_step = generated.first().map(|step| step.id.clone());
            state.role_lifecycle.set("planner_mode", "text_input_minimal_v1");
            state.role_lifecycle.set("planner_step_count", generated.len().to_string());
            state.steps = generated;
            return;
        }

        if state.steps.is_empty() {
            state.steps = vec![self.default_step_contract()];
        }
    }

    fn should_generate_minimal_text_plan(&self, state: &TaskRun) -> bool {
        if state.steps.is_empty() {
            return true;
        }
        if matches!(state.steps.len(), 2 | 3) {
            return false;
        }
        state.steps[0].planner_source.as_deref() == Some("bootstrap_default")
    }

    fn mutate_dispatch(&self, state: &mut TaskRun) -> Result<(), RuntimeError> {
        if state.current_step.is_none() {
            state.current_step = state
                .steps
                .first()
                .map(|step| step.id.clone())
                .or_else(|| Some(self.step_id.clone()));
        }
        let active_step = state
            .current_step
            .clone()
            .unwrap_or_else(|| self.step_id.clone());
        state.current_step = Some(active_step.clone());

        let controller_lane = state
            .role_lifecycle
            .controller_lane
            .clone()
            .filter(|lane| !lane.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONTROLLER_LANE.to_string());
        let lifecycle = &mut state.role_lifecycle;
        lifecycle.set("controller_lane", controller_lane.clone());
        lifecycle.set("controller_ownership", format!("{controller_lane}:{active_step}"));
        lifecycle.set(
            &daokit_core::RoleLifecycle::lane_key(&controller_lane),
            format!("active_step:{active_step}"),
        );
        lifecycle.set_step(&active_step, format!("owned_by_lane:{controller_lane}"));

        if self.dispatch_adapter.is_some() {
            self.dispatch_with_adapter(state, &active_step, &controller_lane)?;
        }
        Ok(())
    }

    fn dispatch_with_adapter(
        &self,
        state: &mut TaskRun,
        active_step: &str,
        controller_lane: &str,
    ) -> Result<(), RuntimeError> {
        let Some(adapter) = self.dispatch_adapter.as_deref() else {
            return Ok(());
        };

        let invocation_index = state
            .role_lifecycle
            .get("dispatch_invocation_count")
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .unwrap_or(0);
        let thread_id = state
            .role_lifecycle
            .get("dispatch_thread_id")
            .map(str::to_string)
            .filter(|thread| !thread.trim().is_empty());
        let contract = state.step_by_id(active_step).cloned();

        let ladder = DispatchLadder {
            adapter,
            task_id: &self.task_id,
            run_id: &self.run_id,
            max_resume_retries: self.max_resume_retries,
            max_rework_attempts: self.max_rework_attempts,
        };
        let outcome = ladder.run(
            state,
            contract.as_ref(),
            active_step,
            controller_lane,
            invocation_index,
            thread_id,
        )?;

        let last = outcome.last().clone();
        let lifecycle = &mut state.role_lifecycle;
        lifecycle.set("dispatch_invocation_count", (invocation_index + 1).to_string());
        lifecycle.set("dispatch_call_sequence", outcome.call_sequence());
        lifecycle.set("dispatch_artifact_count", outcome.calls.len().to_string());
        lifecycle.set("dispatch_last_status", last.status.clone());
        lifecycle.set("dispatch_last_action", last.action.as_str());
        lifecycle.set("dispatch_last_retry_index", last.retry_index.to_string());
        lifecycle.set("dispatch_thread_id", last.thread_id.clone());
        lifecycle.set("dispatch_correlation_id", last.correlation_id.clone());

        self.store.append_event(
            EventDraft::new(
                self.task_id.clone(),
                self.run_id.clone(),
                EventType::System,
                Severity::Info,
                json!({
                    "node": "dispatch",
                    "invocation_index": invocation_index,
                    "controller_lane": controller_lane,
                    "correlation_id": last.correlation_id,
                    "thread_id": last.thread_id,
                    "call_count": outcome.calls.len(),
                    "max_resume_retries": self.max_resume_retries,
                    "max_rework_attempts": self.max_rework_attempts,
                    "calls": outcome.call_entries(),
                }),
            )
            .step(active_step.to_string())
            .dedup(format!(
                "dispatch-invocation:{}:{}:{active_step}:{invocation_index}",
                self.task_id, self.run_id
            )),
        )?;
        Ok(())
    }

    fn mutate_verify(&self, state: &mut TaskRun) -> Result<(), RuntimeError> {
        let Some(evidence_root) = self.evidence_root.as_ref() else {
            state.role_lifecycle.set("acceptance", "passed");
            return Ok(());
        };
        let Some(step) = state.active_step().cloned() else {
            state.role_lifecycle.set("acceptance", "passed");
            return Ok(());
        };

        let decision = evaluate_step(&StepEvaluation {
            task_id: &self.task_id,
            run_id: &self.run_id,
            step_id: &step.id,
            acceptance_criteria: &step.acceptance_criteria,
            expected_outputs: &step.expected_outputs,
            evidence_root,
            changed_files: None,
            allowed_scope: None,
        })?;

        if decision.passed() {
            let lifecycle = &mut state.role_lifecycle;
            lifecycle.set("acceptance", "passed");
            lifecycle.set_step(&step.id, format!("accepted_{}", decision.proof.proof_id));
            self.store.append_event(
                EventDraft::new(
                    self.task_id.clone(),
                    self.run_id.clone(),
                    EventType::StepAccepted,
                    Severity::Info,
                    json!({
                        "proof_id": decision.proof.proof_id,
                        "criteria_count": decision.proof.criteria.len(),
                        "evidence": decision.proof.evidence,
                    }),
                )
                .step(step.id.clone())
                .dedup(format!(
                    "step-accepted:{}:{}:{}:{}",
                    self.task_id, self.run_id, step.id, decision.proof.proof_id
                )),
            )?;
            return Ok(());
        }

        let attempts = routes::rework_attempts(state) + 1;
        let directives = decision
            .rework
            .as_ref()
            .map(|rework| rework.directives.clone())
            .unwrap_or_default();
        let lifecycle = &mut state.role_lifecycle;
        lifecycle.set("acceptance", "rework");
        lifecycle.set("rework:step", step.id.clone());
        lifecycle.set("rework:attempts", attempts.to_string());
        lifecycle.set("rework:directives", directives.join("; "));

        self.store.append_event(
            EventDraft::new(
                self.task_id.clone(),
                self.run_id.clone(),
                EventType::StepReworkRequested,
                Severity::Warn,
                json!({
                    "proof_id": decision.proof.proof_id,
                    "failure_reasons": decision.failure_reasons,
                    "directives": directives,
                    "attempt": attempts,
                }),
            )
            .step(step.id.clone())
            .dedup(format!(
                "step-rework:{}:{}:{}:{}:{attempts}",
                self.task_id, self.run_id, step.id, decision.proof.proof_id
            )),
        )?;
        Ok(())
    }

    fn mutate_transition(&self, state: &mut TaskRun) {
        state.role_lifecycle.set("orchestrator", "completed");
    }

    fn append_route_trace(&self, state: &mut TaskRun, route_id: &str) -> Vec<String> {
        let mut trace = read_route_trace(state.role_lifecycle.get("route:trace"));
        trace.push(route_id.to_string());
        let rendered = serde_json::to_string(&trace).unwrap_or_else(|_| "[]".to_string());
        state.role_lifecycle.set("route:trace", rendered);
        trace
    }

    fn route_trace_id(&self, state: &TaskRun) -> String {
        let active_step = state.current_step.as_deref().unwrap_or(&self.step_id);
        format!("trace:{}:{}:{active_step}", self.task_id, self.run_id)
    }

    fn route_correlation_id(&self, state: &TaskRun) -> String {
        if let Some(correlation) = state
            .role_lifecycle
            .get("dispatch_correlation_id")
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            return correlation.to_string();
        }
        if let Some(correlation) = state
            .role_lifecycle
            .get("route:correlation_id")
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            return correlation.to_string();
        }
        let active_step = state.current_step.as_deref().unwrap_or(&self.step_id);
        format!("corr:{}:{}:{active_step}", self.task_id, self.run_id)
    }

    /// A guard rejection is never swallowed: record the diagnostics as an
    /// ERROR event, then propagate the error unchanged.
    fn append_route_failure_event(
        &self,
        node: NodeName,
        current: OrchestratorStatus,
        state: &TaskRun,
        error: &TransitionError,
    ) -> Result<(), StoreError> {
        let trace = read_route_trace(state.role_lifecycle.get("route:trace"));
        let trace_index = trace.len().saturating_sub(1);
        let (diagnostic_type, attempted, allowed): (&str, Value, Vec<String>) = match error {
            TransitionError::SourceMismatch { attempted, expected, .. } => (
                "route_source_mismatch",
                json!(attempted),
                vec![expected.as_str().to_string()],
            ),
            TransitionError::IllegalTransition { to, allowed, .. } => (
                "route_guard_failure",
                json!(to),
                allowed.iter().map(|status| status.as_str().to_string()).collect(),
            ),
            _ => ("route_guard_failure", json!("<unknown>"), Vec::new()),
        };

        self.store.append_event(
            EventDraft::new(
                state.task_id.clone().unwrap_or_else(|| self.task_id.clone()),
                state.run_id.clone().unwrap_or_else(|| self.run_id.clone()),
                EventType::System,
                Severity::Error,
                json!({
                    "diagnostic_type": diagnostic_type,
                    "node": node,
                    "current_status": current,
                    "attempted_target": attempted,
                    "allowed_targets": allowed,
                    "message": error.to_string(),
                    "actionable_hint": actionable_hint(error),
                    "correlation_id": self.route_correlation_id(state),
                    "branch_trace_id": self.route_trace_id(state),
                    "branch_trace_index": trace_index,
                    "branch_trace": trace,
                }),
            )
            .step_opt(state.current_step.clone()),
        )?;
        Ok(())
    }
}

fn actionable_hint(error: &TransitionError) -> String {
    let message = error.to_string();
    match message.split_once("Action:") {
        Some((_, hint)) => format!("Action: {}", hint.trim()),
        None => "Action: inspect route diagnostics and retry with valid transition inputs."
            .to_string(),
    }
}

/// Parse a persisted route trace: compact JSON array first, comma fallback.
fn read_route_trace(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Vec::new();
    };
    if let Ok(parsed) = serde_json::from_str::<Vec<String>>(raw) {
        return parsed
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();
    }
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
