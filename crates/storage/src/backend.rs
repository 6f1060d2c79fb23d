// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The storage seam every engine component writes through.
//!
//! The file backend in this crate is canonical; a transactional backend
//! (e.g. SQLite) implements the same trait with identical logical schemas.

use crate::StoreError;
use daokit_core::{
    EventDraft, EventRecord, HeartbeatStatus, LeaseLedger, OrchestratorStatus, SnapshotRecord,
    TaskRun,
};

pub trait StateBackend: Send + Sync {
    /// Load the current pipeline ledger, restoring from the snapshot log if
    /// the terminal write was torn.
    fn load_state(&self) -> Result<TaskRun, StoreError>;

    /// Persist the ledger and append its snapshot record in one durable
    /// step. Returns the saved ledger with its refreshed `updated_at`.
    fn save_state(
        &self,
        state: &TaskRun,
        node: Option<&str>,
        from_status: Option<OrchestratorStatus>,
        to_status: Option<OrchestratorStatus>,
    ) -> Result<TaskRun, StoreError>;

    fn load_heartbeat_status(&self) -> Result<HeartbeatStatus, StoreError>;

    fn save_heartbeat_status(&self, status: &HeartbeatStatus) -> Result<HeartbeatStatus, StoreError>;

    /// Append one event. When the draft carries a dedup key already present
    /// for the same run, the append is a no-op returning the existing event.
    fn append_event(&self, draft: EventDraft) -> Result<EventRecord, StoreError>;

    /// All events in append order.
    fn list_events(&self) -> Result<Vec<EventRecord>, StoreError>;

    /// All snapshots in write order.
    fn list_snapshots(&self) -> Result<Vec<SnapshotRecord>, StoreError>;

    fn load_leases(&self) -> Result<LeaseLedger, StoreError>;

    fn save_leases(&self, ledger: &LeaseLedger) -> Result<LeaseLedger, StoreError>;
}
