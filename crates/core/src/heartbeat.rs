// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted heartbeat status and the silence reason vocabulary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted heartbeat classification.
///
/// The pure evaluator reports `ACTIVE`; persistence maps that to `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeartbeatState {
    Idle,
    Running,
    Warning,
    Stale,
}

impl HeartbeatState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeartbeatState::Idle => "IDLE",
            HeartbeatState::Running => "RUNNING",
            HeartbeatState::Warning => "WARNING",
            HeartbeatState::Stale => "STALE",
        }
    }
}

impl std::fmt::Display for HeartbeatState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `heartbeat_status.json` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatStatus {
    pub schema_version: String,
    pub status: HeartbeatState,
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    pub reason_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_after_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_after_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_escalation_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl HeartbeatStatus {
    /// Default record written by the bootstrap layout.
    pub fn bootstrap(now: DateTime<Utc>) -> Self {
        Self {
            schema_version: crate::task_run::SCHEMA_VERSION.to_string(),
            status: HeartbeatState::Idle,
            last_heartbeat_at: None,
            reason_code: None,
            warning_after_seconds: None,
            stale_after_seconds: None,
            last_escalation_at: None,
            updated_at: now,
        }
    }
}

/// Render a silence threshold as a `NO_OUTPUT_<nice-unit>` reason code.
///
/// Whole hours render as `H`, whole minutes as `M`, everything else as `S`.
pub fn silence_reason_code(threshold_seconds: u64) -> String {
    if threshold_seconds > 0 && threshold_seconds % 3600 == 0 {
        return format!("NO_OUTPUT_{}H", threshold_seconds / 3600);
    }
    if threshold_seconds > 0 && threshold_seconds % 60 == 0 {
        return format!("NO_OUTPUT_{}M", threshold_seconds / 60);
    }
    format!("NO_OUTPUT_{threshold_seconds}S")
}
