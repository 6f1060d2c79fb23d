// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat daemon: owns the persisted status and emits deduplicated
//! stale events on the edge into STALE.

use crate::heartbeat::evaluator::{
    evaluate_heartbeat, HeartbeatEvaluation, HeartbeatPhase, HeartbeatThresholds,
};
use crate::heartbeat::HeartbeatError;
use chrono::{DateTime, TimeZone, Utc};
use daokit_core::{
    Clock, EventDraft, EventType, HeartbeatState, HeartbeatStatus, Severity, SCHEMA_VERSION,
};
use daokit_storage::StateBackend;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of one daemon tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatTick {
    pub state: HeartbeatState,
    pub reason_code: Option<String>,
    pub silence_seconds: u64,
    pub stale_event_emitted: bool,
}

/// Periodic heartbeat checker using explicit beats and artifact mtimes.
pub struct HeartbeatDaemon<S, C: Clock> {
    task_id: String,
    run_id: String,
    step_id: String,
    store: Arc<S>,
    artifact_root: PathBuf,
    thresholds: HeartbeatThresholds,
    clock: C,
}

impl<S: StateBackend, C: Clock> HeartbeatDaemon<S, C> {
    pub fn new(
        task_id: impl Into<String>,
        run_id: impl Into<String>,
        step_id: impl Into<String>,
        store: Arc<S>,
        artifact_root: impl Into<PathBuf>,
        thresholds: HeartbeatThresholds,
        clock: C,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            run_id: run_id.into(),
            step_id: step_id.into(),
            store,
            artifact_root: artifact_root.into(),
            thresholds,
            clock,
        }
    }

    pub fn thresholds(&self) -> &HeartbeatThresholds {
        &self.thresholds
    }

    /// Record an explicit beat, flipping the persisted status to RUNNING.
    pub fn record_explicit_heartbeat(
        &self,
        at: Option<DateTime<Utc>>,
    ) -> Result<HeartbeatStatus, HeartbeatError> {
        let beat_at = at.unwrap_or_else(|| self.clock.now_utc());
        let current = self.store.load_heartbeat_status()?;
        let status = HeartbeatStatus {
            schema_version: SCHEMA_VERSION.to_string(),
            status: HeartbeatState::Running,
            last_heartbeat_at: Some(beat_at),
            reason_code: None,
            warning_after_seconds: Some(self.thresholds.warning_after_seconds()),
            stale_after_seconds: Some(self.thresholds.stale_after_seconds()),
            last_escalation_at: current.last_escalation_at,
            updated_at: beat_at,
        };
        Ok(self.store.save_heartbeat_status(&status)?)
    }

    /// Evaluate liveness and persist the classification. Emits exactly one
    /// `HEARTBEAT_STALE` event per edge into STALE; repeated stale ticks
    /// with the same effective signal are deduplicated.
    pub fn tick(&self) -> Result<HeartbeatTick, HeartbeatError> {
        let now = self.clock.now_utc();
        let current = self.store.load_heartbeat_status()?;
        let implicit = latest_artifact_mtime(&self.artifact_root);

        let evaluation = evaluate_heartbeat(
            now,
            true,
            &self.thresholds,
            current.last_heartbeat_at,
            implicit,
        );
        let persisted_state = to_persisted_state(evaluation.phase);

        let mut stale_event_timestamp = None;
        if persisted_state == HeartbeatState::Stale && current.status != HeartbeatState::Stale {
            let event = self.store.append_event(
                EventDraft::new(
                    self.task_id.clone(),
                    self.run_id.clone(),
                    EventType::HeartbeatStale,
                    Severity::Warn,
                    json!({
                        "reason_code": evaluation.reason_code,
                        "silence_seconds": evaluation.silence_seconds,
                        "stale_after_seconds": self.thresholds.stale_after_seconds(),
                        "effective_signal_at": evaluation.effective_signal_at,
                    }),
                )
                .step(self.step_id.clone())
                .dedup(self.stale_dedup_key(&evaluation)),
            )?;
            stale_event_timestamp = Some(event.timestamp);
        }

        self.store.save_heartbeat_status(&HeartbeatStatus {
            schema_version: SCHEMA_VERSION.to_string(),
            status: persisted_state,
            last_heartbeat_at: evaluation.effective_signal_at,
            reason_code: evaluation.reason_code.clone(),
            warning_after_seconds: Some(self.thresholds.warning_after_seconds()),
            stale_after_seconds: Some(self.thresholds.stale_after_seconds()),
            last_escalation_at: stale_event_timestamp.or(current.last_escalation_at),
            updated_at: now,
        })?;

        Ok(HeartbeatTick {
            state: persisted_state,
            reason_code: evaluation.reason_code,
            silence_seconds: evaluation.silence_seconds,
            stale_event_emitted: stale_event_timestamp.is_some(),
        })
    }

    fn stale_dedup_key(&self, evaluation: &HeartbeatEvaluation) -> String {
        let signal = evaluation
            .effective_signal_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "none".to_string());
        let reason = evaluation.reason_code.as_deref().unwrap_or("UNKNOWN");
        format!(
            "heartbeat-stale:{}:{}:{}:{}:{}",
            self.task_id, self.run_id, self.step_id, reason, signal
        )
    }
}

fn to_persisted_state(phase: HeartbeatPhase) -> HeartbeatState {
    match phase {
        HeartbeatPhase::Idle => HeartbeatState::Idle,
        HeartbeatPhase::Active => HeartbeatState::Running,
        HeartbeatPhase::Warning => HeartbeatState::Warning,
        HeartbeatPhase::Stale => HeartbeatState::Stale,
    }
}

/// Most recent file modification time under the artifact root, recursively.
/// Unreadable entries are skipped; a missing root yields no signal.
pub fn latest_artifact_mtime(artifact_root: &Path) -> Option<DateTime<Utc>> {
    fn walk(dir: &Path, latest: &mut Option<DateTime<Utc>>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(&path, latest);
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            let Ok(elapsed) = modified.duration_since(std::time::UNIX_EPOCH) else {
                continue;
            };
            let stamp = Utc
                .timestamp_opt(elapsed.as_secs() as i64, elapsed.subsec_nanos())
                .single();
            if let Some(stamp) = stamp {
                if latest.map(|current| stamp > current).unwrap_or(true) {
                    *latest = Some(stamp);
                }
            }
        }
    }

    let mut latest = None;
    walk(artifact_root, &mut latest);
    latest
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
