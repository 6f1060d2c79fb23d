// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process lease lifecycle manager.
//!
//! All operations are read–modify–write against the lease ledger file, and
//! active-state transitions mirror ownership hints into the task-run ledger
//! so the pipeline and its leases never disagree about who owns a step.

use chrono::{DateTime, Duration, Utc};
use daokit_core::{
    new_lease_token, Clock, EventDraft, EventType, LeaseRecord, LeaseStatus, RoleLifecycle,
    Severity, TaskRun,
};
use daokit_storage::{StateBackend, StoreError};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

/// Lease lifecycle violations.
#[derive(Debug, Error)]
pub enum LeaseError {
    #[error("{name} must be non-empty")]
    EmptyField { name: &'static str },

    #[error("{name} must be a positive integer")]
    NonPositive { name: &'static str },

    #[error("lease token is not bound to the provided task/run/step")]
    NotBound,

    #[error("lease is not ACTIVE (status={status})")]
    NotActive { status: LeaseStatus },

    #[error("lease is expired and cannot {operation}")]
    Expired { operation: &'static str },

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Arguments for minting a new lease.
#[derive(Debug, Clone)]
pub struct RegisterLease {
    pub lane: String,
    pub step_id: String,
    pub task_id: String,
    pub run_id: String,
    pub thread_id: String,
    pub pid: u32,
    pub ttl_seconds: u64,
}

/// The ownership tuple a caller must present for bound operations.
#[derive(Debug, Clone)]
pub struct LeaseKey {
    pub lease_token: String,
    pub task_id: String,
    pub run_id: String,
    pub step_id: String,
}

/// Result of an atomic batch takeover.
#[derive(Debug, Clone, Default)]
pub struct LeaseTakeoverBatch {
    pub adopted: Vec<LeaseRecord>,
    pub non_adopted: Vec<LeaseRecord>,
}

/// File-backed lease registry bound to one state root.
pub struct LeaseRegistry<S, C: Clock> {
    store: Arc<S>,
    clock: C,
}

impl<S: StateBackend, C: Clock> LeaseRegistry<S, C> {
    pub fn new(store: Arc<S>, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn register(&self, args: RegisterLease) -> Result<LeaseRecord, LeaseError> {
        let lane = normalize_lane(&args.lane)?;
        let step_id = expect_non_empty(&args.step_id, "step_id")?;
        let task_id = expect_non_empty(&args.task_id, "task_id")?;
        let run_id = expect_non_empty(&args.run_id, "run_id")?;
        let thread_id = expect_non_empty(&args.thread_id, "thread_id")?;
        if args.pid == 0 {
            return Err(LeaseError::NonPositive { name: "pid" });
        }
        let ttl = expect_positive_seconds(args.ttl_seconds, "ttl_seconds")?;
        let now = self.clock.now_utc();

        let mut ledger = self.store.load_leases()?;
        let record = LeaseRecord {
            lane,
            step_id,
            task_id,
            run_id,
            thread_id,
            pid: args.pid,
            lease_token: new_lease_token(),
            expiry: now + Duration::seconds(ttl),
            status: LeaseStatus::Active,
            last_heartbeat_at: now,
            created_at: now,
            updated_at: now,
        };
        ledger.leases.push(record.clone());
        self.store.save_leases(&ledger)?;
        self.sync_lane_ownership_lifecycle(&record)?;
        Ok(record)
    }

    pub fn heartbeat(
        &self,
        key: &LeaseKey,
        at: Option<DateTime<Utc>>,
    ) -> Result<LeaseRecord, LeaseError> {
        let now = at.unwrap_or_else(|| self.clock.now_utc());
        let mut ledger = self.store.load_leases()?;
        let index = find_bound_lease(&ledger.leases, key)?;
        require_active(&ledger.leases[index])?;

        if ledger.leases[index].is_expired(now) {
            ledger.leases[index].status = LeaseStatus::Expired;
            ledger.leases[index].updated_at = now;
            self.store.save_leases(&ledger)?;
            return Err(LeaseError::Expired { operation: "heartbeat" });
        }

        ledger.leases[index].last_heartbeat_at = now;
        ledger.leases[index].updated_at = now;
        let record = ledger.leases[index].clone();
        self.store.save_leases(&ledger)?;
        Ok(record)
    }

    pub fn renew(
        &self,
        key: &LeaseKey,
        ttl_seconds: u64,
        at: Option<DateTime<Utc>>,
    ) -> Result<LeaseRecord, LeaseError> {
        let ttl = expect_positive_seconds(ttl_seconds, "ttl_seconds")?;
        let now = at.unwrap_or_else(|| self.clock.now_utc());
        let mut ledger = self.store.load_leases()?;
        let index = find_bound_lease(&ledger.leases, key)?;
        require_active(&ledger.leases[index])?;

        if ledger.leases[index].is_expired(now) {
            ledger.leases[index].status = LeaseStatus::Expired;
            ledger.leases[index].updated_at = now;
            self.store.save_leases(&ledger)?;
            return Err(LeaseError::Expired { operation: "renew" });
        }

        ledger.leases[index].last_heartbeat_at = now;
        ledger.leases[index].expiry = now + Duration::seconds(ttl);
        ledger.leases[index].updated_at = now;
        let record = ledger.leases[index].clone();
        self.store.save_leases(&ledger)?;
        Ok(record)
    }

    /// Mark the lease RELEASED. Idempotent on already-released records.
    pub fn release(
        &self,
        key: &LeaseKey,
        at: Option<DateTime<Utc>>,
    ) -> Result<LeaseRecord, LeaseError> {
        let now = at.unwrap_or_else(|| self.clock.now_utc());
        let mut ledger = self.store.load_leases()?;
        let index = find_bound_lease(&ledger.leases, key)?;

        ledger.leases[index].status = LeaseStatus::Released;
        ledger.leases[index].updated_at = now;
        let record = ledger.leases[index].clone();
        self.store.save_leases(&ledger)?;
        self.sync_lane_ownership_lifecycle(&record)?;
        Ok(record)
    }

    /// Adopt a single ACTIVE, unexpired lease for a successor: the token
    /// rotates and ownership moves. Returns `None` when the lease cannot
    /// be adopted (released, or flipped to EXPIRED here).
    pub fn takeover(
        &self,
        key: &LeaseKey,
        successor_thread_id: &str,
        successor_pid: u32,
        ttl_seconds: Option<u64>,
        at: Option<DateTime<Utc>>,
    ) -> Result<Option<LeaseRecord>, LeaseError> {
        let now = at.unwrap_or_else(|| self.clock.now_utc());
        let mut ledger = self.store.load_leases()?;
        let index = find_bound_lease(&ledger.leases, key)?;

        if ledger.leases[index].status != LeaseStatus::Active {
            return Ok(None);
        }
        if ledger.leases[index].is_expired(now) {
            ledger.leases[index].status = LeaseStatus::Expired;
            ledger.leases[index].updated_at = now;
            self.store.save_leases(&ledger)?;
            return Ok(None);
        }

        let predecessor_thread_id = ledger.leases[index].thread_id.clone();
        apply_takeover(&mut ledger.leases[index], successor_thread_id, successor_pid, now, ttl_seconds)?;
        let record = ledger.leases[index].clone();
        self.store.save_leases(&ledger)?;
        self.sync_lane_ownership_lifecycle(&record)?;
        self.append_takeover_event(&record, &predecessor_thread_id, now)?;
        Ok(Some(record))
    }

    /// Atomic batch: every ACTIVE lease in the run is either adopted or,
    /// when already past expiry, marked EXPIRED.
    pub fn takeover_running_leases(
        &self,
        task_id: &str,
        run_id: &str,
        successor_thread_id: &str,
        successor_pid: u32,
        ttl_seconds: Option<u64>,
        at: Option<DateTime<Utc>>,
    ) -> Result<LeaseTakeoverBatch, LeaseError> {
        let task_id = expect_non_empty(task_id, "task_id")?;
        let run_id = expect_non_empty(run_id, "run_id")?;
        let now = at.unwrap_or_else(|| self.clock.now_utc());

        let mut ledger = self.store.load_leases()?;
        let mut batch = LeaseTakeoverBatch::default();
        let mut mutated = false;

        for lease in &mut ledger.leases {
            if lease.task_id != task_id || lease.run_id != run_id {
                continue;
            }
            if lease.status != LeaseStatus::Active {
                continue;
            }
            if lease.is_expired(now) {
                lease.status = LeaseStatus::Expired;
                lease.updated_at = now;
                batch.non_adopted.push(lease.clone());
                mutated = true;
                continue;
            }
            apply_takeover(lease, successor_thread_id, successor_pid, now, ttl_seconds)?;
            batch.adopted.push(lease.clone());
            mutated = true;
        }

        if mutated {
            self.store.save_leases(&ledger)?;
            for lease in batch.adopted.iter().chain(batch.non_adopted.iter()) {
                self.sync_lane_ownership_lifecycle(lease)?;
            }
        }
        Ok(batch)
    }

    pub fn list_leases(
        &self,
        task_id: Option<&str>,
        run_id: Option<&str>,
    ) -> Result<Vec<LeaseRecord>, LeaseError> {
        let ledger = self.store.load_leases()?;
        Ok(ledger
            .leases
            .into_iter()
            .filter(|lease| task_id.map(|task| lease.task_id == task).unwrap_or(true))
            .filter(|lease| run_id.map(|run| lease.run_id == run).unwrap_or(true))
            .collect())
    }

    fn append_takeover_event(
        &self,
        lease: &LeaseRecord,
        predecessor_thread_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.store.append_event(
            EventDraft::new(
                lease.task_id.clone(),
                lease.run_id.clone(),
                EventType::LeaseTakeover,
                Severity::Info,
                json!({
                    "lane": lease.lane,
                    "predecessor_thread_id": predecessor_thread_id,
                    "successor_thread_id": lease.thread_id,
                    "successor_pid": lease.pid,
                    "expiry": lease.expiry,
                }),
            )
            .step(lease.step_id.clone())
            .dedup(format!(
                "lease-takeover:{}:{}:{}:{}",
                lease.task_id,
                lease.run_id,
                lease.step_id,
                at.to_rfc3339()
            )),
        )?;
        Ok(())
    }

    /// Mirror lease ownership into the task-run ledger when it belongs to
    /// the run the ledger describes.
    fn sync_lane_ownership_lifecycle(&self, lease: &LeaseRecord) -> Result<(), StoreError> {
        let mut state = self.store.load_state()?;
        if state.task_id.as_deref() != Some(lease.task_id.as_str())
            || state.run_id.as_deref() != Some(lease.run_id.as_str())
        {
            return Ok(());
        }

        let changed = apply_lifecycle_sync(&mut state, lease);
        if !changed {
            return Ok(());
        }

        let status = state.status;
        self.store.save_state(&state, Some("lease_lifecycle_sync"), Some(status), Some(status))?;
        Ok(())
    }
}

fn apply_lifecycle_sync(state: &mut TaskRun, lease: &LeaseRecord) -> bool {
    let lifecycle = &mut state.role_lifecycle;
    let mut changed = false;

    if lease.status == LeaseStatus::Active {
        changed |= lifecycle.set("controller_lane", lease.lane.clone());
        changed |= lifecycle.set("controller_ownership", format!("{}:{}", lease.lane, lease.step_id));
        changed |= lifecycle.set(
            &RoleLifecycle::lane_key(&lease.lane),
            format!("active_step:{}", lease.step_id),
        );
        changed |= lifecycle.set_step(&lease.step_id, format!("owned_by_lane:{}", lease.lane));
        if state.current_step.is_none() {
            state.current_step = Some(lease.step_id.clone());
            changed = true;
        }
    } else {
        changed |= lifecycle.set_step(
            &lease.step_id,
            format!("lease_{}:{}", lease.status.as_str().to_lowercase(), lease.lane),
        );
        let owned = format!("{}:{}", lease.lane, lease.step_id);
        if lifecycle.controller_ownership.as_deref() == Some(owned.as_str()) {
            changed |= lifecycle.set("controller_ownership", format!("{}:unassigned", lease.lane));
        }
    }
    changed
}

fn apply_takeover(
    lease: &mut LeaseRecord,
    successor_thread_id: &str,
    successor_pid: u32,
    at: DateTime<Utc>,
    ttl_seconds: Option<u64>,
) -> Result<(), LeaseError> {
    let thread_id = expect_non_empty(successor_thread_id, "successor_thread_id")?;
    if successor_pid == 0 {
        return Err(LeaseError::NonPositive { name: "successor_pid" });
    }

    lease.thread_id = thread_id;
    lease.pid = successor_pid;
    lease.lease_token = new_lease_token();
    lease.last_heartbeat_at = at;
    lease.updated_at = at;
    if let Some(ttl) = ttl_seconds {
        let ttl = expect_positive_seconds(ttl, "ttl_seconds")?;
        lease.expiry = at + Duration::seconds(ttl);
    }
    Ok(())
}

fn find_bound_lease(leases: &[LeaseRecord], key: &LeaseKey) -> Result<usize, LeaseError> {
    expect_non_empty(&key.lease_token, "lease_token")?;
    expect_non_empty(&key.task_id, "task_id")?;
    expect_non_empty(&key.run_id, "run_id")?;
    expect_non_empty(&key.step_id, "step_id")?;

    match leases.iter().position(|lease| lease.lease_token == key.lease_token) {
        Some(index) if leases[index].matches(&key.task_id, &key.run_id, &key.step_id) => Ok(index),
        _ => Err(LeaseError::NotBound),
    }
}

fn require_active(lease: &LeaseRecord) -> Result<(), LeaseError> {
    if lease.status != LeaseStatus::Active {
        return Err(LeaseError::NotActive { status: lease.status });
    }
    Ok(())
}

fn expect_non_empty(value: &str, name: &'static str) -> Result<String, LeaseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LeaseError::EmptyField { name });
    }
    Ok(trimmed.to_string())
}

fn expect_positive_seconds(value: u64, name: &'static str) -> Result<i64, LeaseError> {
    if value == 0 {
        return Err(LeaseError::NonPositive { name });
    }
    i64::try_from(value).map_err(|_| LeaseError::NonPositive { name })
}

/// The `default` lane aliases the controller lane.
fn normalize_lane(lane: &str) -> Result<String, LeaseError> {
    let normalized = expect_non_empty(lane, "lane")?;
    if normalized.eq_ignore_ascii_case("default") || normalized.eq_ignore_ascii_case("controller") {
        return Ok("controller".to_string());
    }
    Ok(normalized)
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;
