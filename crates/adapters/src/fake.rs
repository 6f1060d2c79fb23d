// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted in-memory dispatch adapter for tests.

use crate::{DispatchAction, DispatchAdapter, DispatchArtifacts, DispatchCall, DispatchCallResult, DispatchError};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;

/// A dispatch adapter whose call outcomes are scripted up front.
///
/// Each call pops the next scripted status (defaulting to `"success"` when
/// the script runs dry) and records the call for assertions.
pub struct FakeDispatchAdapter {
    script: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<(DispatchAction, DispatchCall)>>,
}

impl FakeDispatchAdapter {
    pub fn new() -> Self {
        Self { script: Mutex::new(VecDeque::new()), calls: Mutex::new(Vec::new()) }
    }

    /// Script the statuses returned by successive calls, in order.
    pub fn with_statuses(statuses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let adapter = Self::new();
        adapter.script.lock().extend(statuses.into_iter().map(Into::into));
        adapter
    }

    /// Actions of every call made so far.
    pub fn call_actions(&self) -> Vec<DispatchAction> {
        self.calls.lock().iter().map(|(action, _)| *action).collect()
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// The rework context attached to the last rework call, if any.
    pub fn last_rework_context(&self) -> Option<serde_json::Value> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find(|(action, _)| *action == DispatchAction::Rework)
            .and_then(|(_, call)| call.rework_context.clone())
    }

    fn answer(
        &self,
        action: DispatchAction,
        call: DispatchCall,
    ) -> Result<DispatchCallResult, DispatchError> {
        let status = self.script.lock().pop_front().unwrap_or_else(|| "success".to_string());
        let thread_id = call
            .thread_id
            .clone()
            .unwrap_or_else(|| format!("fake-thread-{}", call.step_id));
        let correlation_id = format!("corr:{}:{}:{}", call.task_id, call.run_id, call.step_id);
        let result = DispatchCallResult {
            action,
            status: status.clone(),
            retry_index: call.retry_index,
            thread_id,
            correlation_id,
            artifacts: DispatchArtifacts::default(),
            parsed_output: json!({"scripted": true, "status": status}),
        };
        self.calls.lock().push((action, call));
        Ok(result)
    }
}

impl Default for FakeDispatchAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchAdapter for FakeDispatchAdapter {
    fn create(&self, call: DispatchCall) -> Result<DispatchCallResult, DispatchError> {
        self.answer(DispatchAction::Create, call)
    }

    fn resume(&self, call: DispatchCall) -> Result<DispatchCallResult, DispatchError> {
        self.answer(DispatchAction::Resume, call)
    }

    fn rework(&self, call: DispatchCall) -> Result<DispatchCallResult, DispatchError> {
        self.answer(DispatchAction::Rework, call)
    }
}
