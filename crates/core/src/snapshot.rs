// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot records appended alongside every state save.

use crate::status::OrchestratorStatus;
use crate::task_run::TaskRun;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A deep copy of the ledger captured at a state-machine transition.
///
/// `state` equals the pipeline state persisted by the same save, so replaying
/// the snapshot log reproduces every durable ledger the run has seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub timestamp: DateTime<Utc>,
    pub node: Option<String>,
    pub from_status: Option<OrchestratorStatus>,
    pub to_status: Option<OrchestratorStatus>,
    pub state: TaskRun,
}
