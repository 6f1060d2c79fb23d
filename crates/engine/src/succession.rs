// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Successor acceptance: batch lease adoption plus the ledger and event
//! records that make the takeover auditable.

use crate::lease::{LeaseError, LeaseRegistry};
use chrono::{DateTime, Utc};
use daokit_core::{Clock, EventDraft, EventType, ReasonCode, Severity};
use daokit_storage::StateBackend;
use serde_json::json;
use std::sync::Arc;

/// Summary of one takeover: which steps were adopted and which failed
/// because their lease had already expired.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SuccessionTakeover {
    pub task_id: String,
    pub run_id: String,
    pub takeover_at: DateTime<Utc>,
    pub adopted_step_ids: Vec<String>,
    pub failed_step_ids: Vec<String>,
}

/// Handles successor acceptance for one run.
pub struct SuccessionManager<S, C: Clock> {
    task_id: String,
    run_id: String,
    store: Arc<S>,
    registry: LeaseRegistry<S, C>,
    clock: C,
}

impl<S: StateBackend, C: Clock> SuccessionManager<S, C> {
    pub fn new(
        task_id: impl Into<String>,
        run_id: impl Into<String>,
        store: Arc<S>,
        clock: C,
    ) -> Self {
        let registry = LeaseRegistry::new(store.clone(), clock.clone());
        Self { task_id: task_id.into(), run_id: run_id.into(), store, registry, clock }
    }

    /// Take over every running lease for this run, classify the outcome,
    /// persist the succession state, and emit the takeover events.
    pub fn accept_successor(
        &self,
        successor_thread_id: &str,
        successor_pid: u32,
        lease_ttl_seconds: Option<u64>,
    ) -> Result<SuccessionTakeover, LeaseError> {
        let takeover_at = self.clock.now_utc();

        let batch = self.registry.takeover_running_leases(
            &self.task_id,
            &self.run_id,
            successor_thread_id,
            successor_pid,
            lease_ttl_seconds,
            Some(takeover_at),
        )?;

        let adopted_step_ids = ordered_unique(batch.adopted.iter().map(|lease| lease.step_id.clone()));
        let failed_step_ids =
            ordered_unique(batch.non_adopted.iter().map(|lease| lease.step_id.clone()));

        self.persist_succession_state(takeover_at, &adopted_step_ids, &failed_step_ids)?;
        self.append_events(takeover_at, &adopted_step_ids, &failed_step_ids)?;

        Ok(SuccessionTakeover {
            task_id: self.task_id.clone(),
            run_id: self.run_id.clone(),
            takeover_at,
            adopted_step_ids,
            failed_step_ids,
        })
    }

    fn persist_succession_state(
        &self,
        takeover_at: DateTime<Utc>,
        adopted_step_ids: &[String],
        failed_step_ids: &[String],
    ) -> Result<(), LeaseError> {
        let mut state = self.store.load_state()?;
        let prior_status = state.status;
        let mut changed = false;

        if state.task_id.as_deref() != Some(self.task_id.as_str()) {
            state.task_id = Some(self.task_id.clone());
            changed = true;
        }
        if state.run_id.as_deref() != Some(self.run_id.as_str()) {
            state.run_id = Some(self.run_id.clone());
            changed = true;
        }

        if !adopted_step_ids.is_empty()
            && state.succession.last_takeover_at != Some(takeover_at)
        {
            state.succession.last_takeover_at = Some(takeover_at);
            changed = true;
        }

        for step_id in failed_step_ids {
            changed |= state.role_lifecycle.set_step(step_id, "failed_non_adopted_lease");
        }

        if changed {
            self.store.save_state(
                &state,
                Some("succession_takeover"),
                Some(prior_status),
                Some(state.status),
            )?;
        }
        Ok(())
    }

    fn append_events(
        &self,
        takeover_at: DateTime<Utc>,
        adopted_step_ids: &[String],
        failed_step_ids: &[String],
    ) -> Result<(), LeaseError> {
        let takeover_key = takeover_at.to_rfc3339();

        self.store.append_event(
            EventDraft::new(
                self.task_id.clone(),
                self.run_id.clone(),
                EventType::SuccessionAccepted,
                Severity::Info,
                json!({
                    "takeover_at": takeover_key,
                    "adopted_step_ids": adopted_step_ids,
                    "failed_step_ids": failed_step_ids,
                }),
            )
            .dedup(format!("succession:{}:{}:{}", self.task_id, self.run_id, takeover_key)),
        )?;

        for step_id in adopted_step_ids {
            self.store.append_event(
                EventDraft::new(
                    self.task_id.clone(),
                    self.run_id.clone(),
                    EventType::LeaseAdopted,
                    Severity::Info,
                    json!({
                        "reason_code": ReasonCode::ValidUnexpiredLease,
                        "takeover_at": takeover_key,
                    }),
                )
                .step(step_id.clone())
                .dedup(format!(
                    "lease-adopted:{}:{}:{}:{}",
                    self.task_id, self.run_id, step_id, takeover_key
                )),
            )?;
        }

        for step_id in failed_step_ids {
            self.store.append_event(
                EventDraft::new(
                    self.task_id.clone(),
                    self.run_id.clone(),
                    EventType::StepFailed,
                    Severity::Error,
                    json!({
                        "reason_code": ReasonCode::LeaseNotAdopted,
                        "takeover_at": takeover_key,
                    }),
                )
                .step(step_id.clone())
                .dedup(format!(
                    "step-failed:{}:{}:{}:{}",
                    self.task_id, self.run_id, step_id, takeover_key
                )),
            )?;
        }
        Ok(())
    }
}

fn ordered_unique(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for value in values {
        if seen.insert(value.clone()) {
            out.push(value);
        }
    }
    out
}

#[cfg(test)]
#[path = "succession_tests.rs"]
mod tests;
