// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dispatch invocation ladder: exactly one `create`, then bounded
//! `resume` and `rework` attempts while the adapter keeps failing.

use daokit_adapters::{DispatchAdapter, DispatchCall, DispatchCallResult, DispatchError};
use daokit_core::{StepContract, TaskRun};
use serde_json::{json, Value};

/// Summary of one full ladder run for a step.
pub(crate) struct DispatchOutcome {
    pub calls: Vec<DispatchCallResult>,
    pub invocation_index: u32,
}

impl DispatchOutcome {
    pub fn last(&self) -> &DispatchCallResult {
        // The ladder always makes at least the create call.
        &self.calls[self.calls.len() - 1]
    }

    pub fn call_sequence(&self) -> String {
        self.calls
            .iter()
            .map(|call| call.action.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn call_entries(&self) -> Vec<Value> {
        self.calls
            .iter()
            .map(|call| {
                json!({
                    "action": call.action,
                    "status": call.status,
                    "retry_index": call.retry_index,
                    "thread_id": call.thread_id,
                    "correlation_id": call.correlation_id,
                    "artifacts": call.artifacts.normalized_paths(),
                })
            })
            .collect()
    }
}

pub(crate) struct DispatchLadder<'a> {
    pub adapter: &'a dyn DispatchAdapter,
    pub task_id: &'a str,
    pub run_id: &'a str,
    pub max_resume_retries: u32,
    pub max_rework_attempts: u32,
}

impl DispatchLadder<'_> {
    /// Run the ladder for the active step.
    pub fn run(
        &self,
        state: &TaskRun,
        step_contract: Option<&StepContract>,
        active_step: &str,
        controller_lane: &str,
        invocation_index: u32,
        thread_id: Option<String>,
    ) -> Result<DispatchOutcome, DispatchError> {
        let correlation_id = format!("corr:{}:{}:{active_step}", self.task_id, self.run_id);
        let request = self.build_request(
            state,
            step_contract,
            active_step,
            controller_lane,
            &correlation_id,
            invocation_index,
        );

        let mut calls: Vec<DispatchCallResult> = Vec::new();
        let mut retry_index = 0u32;
        let mut thread_id = thread_id;

        let mut current = self.adapter.create(DispatchCall {
            task_id: self.task_id.to_string(),
            run_id: self.run_id.to_string(),
            step_id: active_step.to_string(),
            request: request.clone(),
            thread_id: thread_id.clone(),
            retry_index,
            rework_context: None,
        })?;
        retry_index = current.retry_index;
        thread_id = Some(current.thread_id.clone());
        calls.push(current.clone());

        for resume_attempt in 0..self.max_resume_retries {
            if current.succeeded() {
                break;
            }
            retry_index += 1;
            let mut resume_request = request.clone();
            resume_request["resume_attempt"] = json!(resume_attempt + 1);
            current = self.adapter.resume(DispatchCall {
                task_id: self.task_id.to_string(),
                run_id: self.run_id.to_string(),
                step_id: active_step.to_string(),
                request: resume_request,
                thread_id: thread_id.clone(),
                retry_index,
                rework_context: None,
            })?;
            retry_index = current.retry_index;
            thread_id = Some(current.thread_id.clone());
            calls.push(current.clone());
        }

        for rework_attempt in 0..self.max_rework_attempts {
            if current.succeeded() {
                break;
            }
            retry_index += 1;
            let mut rework_request = request.clone();
            rework_request["rework_attempt"] = json!(rework_attempt + 1);
            current = self.adapter.rework(DispatchCall {
                task_id: self.task_id.to_string(),
                run_id: self.run_id.to_string(),
                step_id: active_step.to_string(),
                request: rework_request,
                thread_id: thread_id.clone(),
                retry_index,
                rework_context: Some(self.build_rework_context(&calls)),
            })?;
            retry_index = current.retry_index;
            thread_id = Some(current.thread_id.clone());
            calls.push(current.clone());
        }

        Ok(DispatchOutcome { calls, invocation_index })
    }

    fn build_request(
        &self,
        state: &TaskRun,
        step_contract: Option<&StepContract>,
        active_step: &str,
        controller_lane: &str,
        correlation_id: &str,
        invocation_index: u32,
    ) -> Value {
        let mut request = json!({
            "task_kind": "step",
            "task_id": self.task_id,
            "run_id": self.run_id,
            "step_id": active_step,
            "goal": state.goal,
            "controller_lane": controller_lane,
            "correlation_id": correlation_id,
            "invocation_index": invocation_index,
        });
        if let Some(contract) = step_contract {
            if !contract.title.trim().is_empty() {
                request["step_title"] = json!(contract.title.trim());
            }
            if !contract.acceptance_criteria.is_empty() {
                request["acceptance_criteria"] = json!(contract.acceptance_criteria);
            }
            if !contract.expected_outputs.is_empty() {
                request["expected_outputs"] = json!(contract.expected_outputs);
            }
        }
        request
    }

    fn build_rework_context(&self, calls: &[DispatchCallResult]) -> Value {
        let failed_calls: Vec<Value> = calls
            .iter()
            .filter(|call| !call.succeeded())
            .map(|call| {
                json!({
                    "action": call.action,
                    "status": call.status,
                    "retry_index": call.retry_index,
                    "parsed_output": call.parsed_output,
                })
            })
            .collect();
        json!({
            "reason": "dispatch_retry_exhausted",
            "max_resume_retries": self.max_resume_retries,
            "max_rework_attempts": self.max_rework_attempts,
            "failed_calls": failed_calls,
        })
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
