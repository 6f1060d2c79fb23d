// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! daokit-core: shared types for the DAOKit orchestration runtime

pub mod acceptance;
pub mod clock;
pub mod event;
pub mod handoff;
pub mod hash;
pub mod heartbeat;
pub mod id;
pub mod lease;
pub mod reason;
pub mod snapshot;
pub mod status;
pub mod task_run;

pub use acceptance::{
    AcceptanceDecision, AcceptanceProof, AcceptanceStatus, CriterionResult, EvidenceRecord,
    FailureReason, ReworkCriterion, ReworkPayload,
};
pub use clock::{Clock, FakeClock, SystemClock};
pub use event::{EventDraft, EventRecord, EventType, Severity};
pub use handoff::{HandoffPackage, OpenAcceptanceItem, StepStatusBuckets};
pub use hash::{canonical_json, sha256_hex, stable_hash};
pub use heartbeat::{silence_reason_code, HeartbeatState, HeartbeatStatus};
pub use id::{new_event_id, new_lease_token};
pub use lease::{LeaseLedger, LeaseRecord, LeaseStatus};
pub use reason::ReasonCode;
pub use snapshot::SnapshotRecord;
pub use status::{
    allowed_targets, guard_transition, node_for_status, NodeName, OrchestratorStatus,
    TransitionError,
};
pub use task_run::{RoleLifecycle, StepContract, Succession, TaskRun, SCHEMA_VERSION};
