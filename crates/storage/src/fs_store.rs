// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed state store.
//!
//! Every mutating operation acquires the root's advisory lock, derives new
//! file content from a read snapshot, and replaces files atomically via
//! write-to-temp-and-rename. `save_state` appends the snapshot record
//! before swapping the ledger file, so a torn write is always recoverable
//! from the snapshot log.

use crate::backend::StateBackend;
use crate::layout::{
    EVENTS_FILE, HEARTBEAT_STATUS_FILE, LOCK_FILE, PIPELINE_STATE_FILE, PROCESS_LEASES_FILE,
    SNAPSHOTS_FILE,
};
use crate::StoreError;
use chrono::{DateTime, Duration, Utc};
use daokit_core::{
    new_event_id, Clock, EventDraft, EventRecord, HeartbeatStatus, LeaseLedger,
    OrchestratorStatus, SnapshotRecord, SystemClock, TaskRun,
};
use fs2::FileExt;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Canonical filesystem backend. One instance per state root.
pub struct FsStateStore<C: Clock = SystemClock> {
    root: PathBuf,
    clock: C,
    /// Ratchet keeping `updated_at` strictly monotone within this process.
    last_stamp: Mutex<Option<DateTime<Utc>>>,
}

/// Holds the advisory lock for the duration of one mutating operation.
struct LockGuard {
    file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

impl<C: Clock> FsStateStore<C> {
    /// Open (and lay out) the state root.
    pub fn open(root: impl Into<PathBuf>, clock: C) -> Result<Self, StoreError> {
        let store = Self { root: root.into(), clock, last_stamp: Mutex::new(None) };
        store.ensure_layout()?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_layout(&self) -> Result<(), StoreError> {
        if self.root.is_file() {
            return Err(StoreError::RootConflict(self.root.clone()));
        }
        fs::create_dir_all(&self.root)?;
        let now = self.clock.now_utc();

        self.seed_json(PIPELINE_STATE_FILE, &TaskRun::bootstrap(now))?;
        self.seed_json(HEARTBEAT_STATUS_FILE, &HeartbeatStatus::bootstrap(now))?;
        self.seed_json(PROCESS_LEASES_FILE, &LeaseLedger::bootstrap(now))?;
        for log in [EVENTS_FILE, SNAPSHOTS_FILE] {
            let path = self.path(log);
            if path.is_dir() {
                return Err(StoreError::PathConflict(path));
            }
            if !path.exists() {
                fs::write(&path, b"")?;
            }
        }
        Ok(())
    }

    fn seed_json<T: Serialize>(&self, name: &str, default: &T) -> Result<(), StoreError> {
        let path = self.path(name);
        if path.is_dir() {
            return Err(StoreError::PathConflict(path));
        }
        if !path.exists() {
            self.write_json_atomic(&path, default)?;
        }
        Ok(())
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn lock(&self) -> Result<LockGuard, StoreError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.path(LOCK_FILE))?;
        file.lock_exclusive()?;
        Ok(LockGuard { file })
    }

    /// Next `updated_at` stamp, strictly after every stamp this process has
    /// already issued even when the wall clock stalls.
    fn next_stamp(&self) -> DateTime<Utc> {
        let mut last = self.last_stamp.lock();
        let mut now = self.clock.now_utc();
        if let Some(previous) = *last {
            if now <= previous {
                now = previous + Duration::milliseconds(1);
            }
        }
        *last = Some(now);
        now
    }

    fn write_json_atomic<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        let mut body = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Parse {
            file: display_name(path),
            source,
        })?;
        body.push(b'\n');

        let tmp = path.with_file_name(format!(
            "{}.tmp.{}",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("file"),
            std::process::id()
        ));
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&body)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn append_line<T: Serialize>(&self, name: &str, record: &T) -> Result<(), StoreError> {
        let path = self.path(name);
        let mut line = serde_json::to_vec(record).map_err(|source| StoreError::Parse {
            file: name.to_string(),
            source,
        })?;
        line.push(b'\n');
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(&line)?;
        file.sync_all()?;
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, StoreError> {
        let path = self.path(name);
        if path.is_dir() {
            return Err(StoreError::PathConflict(path));
        }
        let body = fs::read_to_string(&path)?;
        serde_json::from_str(&body).map_err(|source| StoreError::Parse {
            file: name.to_string(),
            source,
        })
    }

    /// Parse a JSONL file. A corrupted terminal line is discarded with a
    /// warning (torn append); corruption earlier in the log is an error.
    fn read_lines<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, StoreError> {
        let path = self.path(name);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let body = fs::read_to_string(&path)?;
        let lines: Vec<&str> = body.lines().filter(|line| !line.trim().is_empty()).collect();

        let mut records = Vec::with_capacity(lines.len());
        for (index, line) in lines.iter().enumerate() {
            match serde_json::from_str::<T>(line) {
                Ok(record) => records.push(record),
                Err(source) if index + 1 == lines.len() => {
                    tracing::warn!(file = name, line = index + 1, error = %source, "discarding corrupted terminal log entry");
                }
                Err(source) => {
                    return Err(StoreError::ParseLine { file: name.to_string(), line: index + 1, source });
                }
            }
        }
        Ok(records)
    }

    /// Restore the ledger from the last intact snapshot after a torn
    /// pipeline-state write.
    fn recover_state_from_snapshots(
        &self,
        cause: &serde_json::Error,
    ) -> Result<TaskRun, StoreError> {
        let snapshots: Vec<SnapshotRecord> = self.read_lines(SNAPSHOTS_FILE)?;
        let Some(last) = snapshots.into_iter().last() else {
            return Err(StoreError::Parse {
                file: PIPELINE_STATE_FILE.to_string(),
                source: serde_json::Error::io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    cause.to_string(),
                )),
            });
        };
        tracing::warn!(
            node = last.node.as_deref().unwrap_or("-"),
            "pipeline state was unreadable; restored ledger from last snapshot"
        );
        self.write_json_atomic(&self.path(PIPELINE_STATE_FILE), &last.state)?;
        Ok(last.state)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("file").to_string()
}

impl<C: Clock> StateBackend for FsStateStore<C> {
    fn load_state(&self) -> Result<TaskRun, StoreError> {
        match self.read_json::<TaskRun>(PIPELINE_STATE_FILE) {
            Ok(state) => Ok(state),
            Err(StoreError::Parse { source, .. }) => self.recover_state_from_snapshots(&source),
            Err(other) => Err(other),
        }
    }

    fn save_state(
        &self,
        state: &TaskRun,
        node: Option<&str>,
        from_status: Option<OrchestratorStatus>,
        to_status: Option<OrchestratorStatus>,
    ) -> Result<TaskRun, StoreError> {
        let _guard = self.lock()?;
        let mut saved = state.clone();
        saved.updated_at = self.next_stamp();

        let snapshot = SnapshotRecord {
            timestamp: saved.updated_at,
            node: node.map(str::to_string),
            from_status,
            to_status,
            state: saved.clone(),
        };
        // Snapshot first: a crash between the two writes leaves the previous
        // ledger readable and the new state recoverable from the log.
        self.append_line(SNAPSHOTS_FILE, &snapshot)?;
        self.write_json_atomic(&self.path(PIPELINE_STATE_FILE), &saved)?;
        Ok(saved)
    }

    fn load_heartbeat_status(&self) -> Result<HeartbeatStatus, StoreError> {
        self.read_json(HEARTBEAT_STATUS_FILE)
    }

    fn save_heartbeat_status(&self, status: &HeartbeatStatus) -> Result<HeartbeatStatus, StoreError> {
        let _guard = self.lock()?;
        let mut saved = status.clone();
        saved.updated_at = self.next_stamp();
        self.write_json_atomic(&self.path(HEARTBEAT_STATUS_FILE), &saved)?;
        Ok(saved)
    }

    fn append_event(&self, draft: EventDraft) -> Result<EventRecord, StoreError> {
        let _guard = self.lock()?;

        if let Some(dedup_key) = draft.dedup_key.as_deref() {
            let existing: Vec<EventRecord> = self.read_lines(EVENTS_FILE)?;
            if let Some(found) = existing.into_iter().find(|event| {
                event.run_id == draft.run_id && event.dedup_key.as_deref() == Some(dedup_key)
            }) {
                return Ok(found);
            }
        }

        let record = EventRecord {
            schema_version: daokit_core::SCHEMA_VERSION.to_string(),
            event_id: new_event_id(),
            task_id: draft.task_id,
            run_id: draft.run_id,
            step_id: draft.step_id,
            event_type: draft.event_type,
            severity: draft.severity,
            timestamp: self.clock.now_utc(),
            payload: draft.payload,
            dedup_key: draft.dedup_key,
        };
        self.append_line(EVENTS_FILE, &record)?;
        Ok(record)
    }

    fn list_events(&self) -> Result<Vec<EventRecord>, StoreError> {
        self.read_lines(EVENTS_FILE)
    }

    fn list_snapshots(&self) -> Result<Vec<SnapshotRecord>, StoreError> {
        self.read_lines(SNAPSHOTS_FILE)
    }

    fn load_leases(&self) -> Result<LeaseLedger, StoreError> {
        self.read_json(PROCESS_LEASES_FILE)
    }

    fn save_leases(&self, ledger: &LeaseLedger) -> Result<LeaseLedger, StoreError> {
        let _guard = self.lock()?;
        let mut saved = ledger.clone();
        saved.updated_at = self.next_stamp();
        self.write_json_atomic(&self.path(PROCESS_LEASES_FILE), &saved)?;
        Ok(saved)
    }
}

#[cfg(test)]
#[path = "fs_store_tests.rs"]
mod tests;
