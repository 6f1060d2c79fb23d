// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process lease records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaseStatus {
    Active,
    Expired,
    Released,
}

impl LeaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaseStatus::Active => "ACTIVE",
            LeaseStatus::Expired => "EXPIRED",
            LeaseStatus::Released => "RELEASED",
        }
    }
}

impl std::fmt::Display for LeaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An expiring exclusive claim by a thread/pid on a step in a lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaseRecord {
    pub lane: String,
    pub step_id: String,
    pub task_id: String,
    pub run_id: String,
    pub thread_id: String,
    pub pid: u32,
    pub lease_token: String,
    pub expiry: DateTime<Utc>,
    pub status: LeaseStatus,
    pub last_heartbeat_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeaseRecord {
    /// A lease past (or at) its expiry can no longer be heartbeat or adopted.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry <= now
    }

    /// Whether this lease is bound to the given ownership tuple.
    pub fn matches(&self, task_id: &str, run_id: &str, step_id: &str) -> bool {
        self.task_id == task_id && self.run_id == run_id && self.step_id == step_id
    }
}

/// The `process_leases.json` file payload. Records are retained after
/// expiry and release as takeover evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaseLedger {
    pub schema_version: String,
    pub leases: Vec<LeaseRecord>,
    pub updated_at: DateTime<Utc>,
}

impl LeaseLedger {
    pub fn bootstrap(now: DateTime<Utc>) -> Self {
        Self {
            schema_version: crate::task_run::SCHEMA_VERSION.to_string(),
            leases: Vec::new(),
            updated_at: now,
        }
    }
}
