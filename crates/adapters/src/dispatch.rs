// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch capability set and call results.

use crate::artifact::DispatchArtifacts;
use crate::DispatchError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which capability a call exercised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchAction {
    Create,
    Resume,
    Rework,
}

impl DispatchAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchAction::Create => "create",
            DispatchAction::Resume => "resume",
            DispatchAction::Rework => "rework",
        }
    }
}

impl std::fmt::Display for DispatchAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One invocation handed to an adapter.
#[derive(Debug, Clone)]
pub struct DispatchCall {
    pub task_id: String,
    pub run_id: String,
    pub step_id: String,
    pub request: Value,
    pub thread_id: Option<String>,
    pub retry_index: u32,
    /// Populated on the final `rework` attempt with the prior failures.
    pub rework_context: Option<Value>,
}

/// Outcome of one adapter call. `status` is `"success"` on success;
/// adapters report their own failure vocabulary otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchCallResult {
    pub action: DispatchAction,
    pub status: String,
    pub retry_index: u32,
    pub thread_id: String,
    pub correlation_id: String,
    pub artifacts: DispatchArtifacts,
    pub parsed_output: Value,
}

impl DispatchCallResult {
    pub fn succeeded(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case("success")
    }
}

/// The capability set the orchestrator depends on.
///
/// Implementations persist every call's request/response/error artifacts
/// themselves (see [`crate::ArtifactStore`]); the orchestrator only reads
/// the returned artifact paths.
pub trait DispatchAdapter: Send + Sync {
    fn create(&self, call: DispatchCall) -> Result<DispatchCallResult, DispatchError>;
    fn resume(&self, call: DispatchCall) -> Result<DispatchCallResult, DispatchError>;
    fn rework(&self, call: DispatchCall) -> Result<DispatchCallResult, DispatchError>;
}
