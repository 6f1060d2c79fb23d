// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The task-run ledger record and its step contracts.

use crate::status::OrchestratorStatus;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Schema version stamped on every persisted top-level record.
pub const SCHEMA_VERSION: &str = "1.0.0";

fn schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

fn default_orchestrator() -> String {
    "idle".to_string()
}

/// An immutable work unit inside a plan.
///
/// `actions`, `acceptance_criteria`, and `expected_outputs` are non-empty
/// for any contract that went through the plan compiler; ledgers restored
/// from older files are re-validated on compile, not on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepContract {
    pub id: String,
    pub title: String,
    pub category: String,
    pub goal: String,
    pub actions: Vec<String>,
    pub acceptance_criteria: Vec<String>,
    pub expected_outputs: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Which planner produced this contract (`bootstrap_default`,
    /// `text_input_minimal_v1`, ...). Absent for operator-supplied plans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planner_source: Option<String>,
}

/// Succession policy and the evidence of the last takeover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Succession {
    pub enabled: bool,
    pub last_takeover_at: Option<DateTime<Utc>>,
}

impl Default for Succession {
    fn default() -> Self {
        Self { enabled: true, last_takeover_at: None }
    }
}

/// Role lifecycle hints persisted inside the ledger.
///
/// Three keys are canonical enough to type; every other entry
/// (`step:<id>`, `lane:<name>`, `route:*`, `handoff_*`, dispatch counters)
/// lives in the ordered extension map and round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleLifecycle {
    #[serde(default = "default_orchestrator")]
    pub orchestrator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_lane: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_ownership: Option<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, String>,
}

impl Default for RoleLifecycle {
    fn default() -> Self {
        Self {
            orchestrator: "idle".to_string(),
            controller_lane: None,
            controller_ownership: None,
            extra: IndexMap::new(),
        }
    }
}

impl RoleLifecycle {
    /// Lifecycle key for a step entry.
    pub fn step_key(step_id: &str) -> String {
        format!("step:{step_id}")
    }

    /// Lifecycle key for a lane entry.
    pub fn lane_key(lane: &str) -> String {
        format!("lane:{lane}")
    }

    /// Read any lifecycle value, typed fields included.
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "orchestrator" => Some(self.orchestrator.as_str()),
            "controller_lane" => self.controller_lane.as_deref(),
            "controller_ownership" => self.controller_ownership.as_deref(),
            _ => self.extra.get(key).map(String::as_str),
        }
    }

    /// Write any lifecycle value, routing canonical keys to typed fields.
    /// Returns true when the stored value changed.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        match key {
            "orchestrator" => {
                if self.orchestrator == value {
                    return false;
                }
                self.orchestrator = value;
                true
            }
            "controller_lane" => {
                if self.controller_lane.as_deref() == Some(value.as_str()) {
                    return false;
                }
                self.controller_lane = Some(value);
                true
            }
            "controller_ownership" => {
                if self.controller_ownership.as_deref() == Some(value.as_str()) {
                    return false;
                }
                self.controller_ownership = Some(value);
                true
            }
            _ => {
                if self.extra.get(key).map(String::as_str) == Some(value.as_str()) {
                    return false;
                }
                self.extra.insert(key.to_string(), value);
                true
            }
        }
    }

    pub fn step(&self, step_id: &str) -> Option<&str> {
        self.extra.get(&Self::step_key(step_id)).map(String::as_str)
    }

    pub fn set_step(&mut self, step_id: &str, value: impl Into<String>) -> bool {
        let key = Self::step_key(step_id);
        self.set(&key, value)
    }
}

/// The single durable pipeline ledger for one task run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRun {
    #[serde(default = "schema_version")]
    pub schema_version: String,
    pub task_id: Option<String>,
    pub run_id: Option<String>,
    #[serde(default)]
    pub goal: String,
    pub status: OrchestratorStatus,
    #[serde(default)]
    pub current_step: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepContract>,
    #[serde(default)]
    pub role_lifecycle: RoleLifecycle,
    #[serde(default)]
    pub succession: Succession,
    pub updated_at: DateTime<Utc>,
}

impl TaskRun {
    /// Default ledger content written by the bootstrap layout.
    pub fn bootstrap(now: DateTime<Utc>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            task_id: None,
            run_id: None,
            goal: String::new(),
            status: OrchestratorStatus::Planning,
            current_step: None,
            steps: Vec::new(),
            role_lifecycle: RoleLifecycle::default(),
            succession: Succession::default(),
            updated_at: now,
        }
    }

    /// The step the ledger currently points at, falling back to the first.
    pub fn active_step(&self) -> Option<&StepContract> {
        if let Some(current) = self.current_step.as_deref() {
            if let Some(step) = self.steps.iter().find(|step| step.id == current) {
                return Some(step);
            }
        }
        self.steps.first()
    }

    pub fn step_by_id(&self, step_id: &str) -> Option<&StepContract> {
        self.steps.iter().find(|step| step.id == step_id)
    }
}

#[cfg(test)]
#[path = "task_run_tests.rs"]
mod tests;
