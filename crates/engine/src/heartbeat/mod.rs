// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat liveness subsystem: pure evaluator, persisting daemon, and the
//! periodic supervisor loop.

mod daemon;
mod evaluator;
mod supervisor;

pub use daemon::{latest_artifact_mtime, HeartbeatDaemon, HeartbeatTick};
pub use evaluator::{
    evaluate_heartbeat, HeartbeatEvaluation, HeartbeatPhase, HeartbeatThresholds,
};
pub use supervisor::supervise;

use daokit_storage::StoreError;
use thiserror::Error;

/// Heartbeat evaluation and persistence failures.
#[derive(Debug, Error)]
pub enum HeartbeatError {
    #[error("{name} must be a positive number of seconds")]
    NonPositiveThreshold { name: &'static str },

    #[error("warning_after_seconds must be >= check_interval_seconds")]
    WarningBelowCheckInterval,

    #[error("stale_after_seconds must be >= warning_after_seconds")]
    StaleBelowWarning,

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}
