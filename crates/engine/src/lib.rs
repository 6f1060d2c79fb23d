// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! daokit-engine: the deterministic orchestration runtime.
//!
//! Houses the guarded state machine, the liveness subsystem (heartbeat
//! evaluation, process leases, succession takeover), the compact-and-resume
//! handoff protocol, the acceptance engine, and the lifecycle hook runtime.

pub mod acceptance;
pub mod handoff;
pub mod heartbeat;
pub mod hooks;
pub mod lease;
pub mod rotation;
pub mod runtime;
pub mod settings;
pub mod succession;

pub use acceptance::{
    audit_changed_files, build_audit_summary, evaluate_step, AcceptanceError, DiffAudit,
    ScopeError, StepEvaluation,
};
pub use handoff::{HandoffError, HandoffResumePlan, HandoffStore};
pub use heartbeat::{
    evaluate_heartbeat, latest_artifact_mtime, supervise, HeartbeatDaemon, HeartbeatError,
    HeartbeatEvaluation, HeartbeatPhase, HeartbeatThresholds, HeartbeatTick,
};
pub use hooks::{
    HookEntryStatus, HookError, HookExecutionEntry, HookPoint, HookRunResult, HookRunStatus,
    HookRuntime,
};
pub use lease::{LeaseError, LeaseKey, LeaseRegistry, LeaseTakeoverBatch, RegisterLease};
pub use rotation::register_rotation_hooks;
pub use runtime::{OrchestratorRuntime, RuntimeConfig, RuntimeError};
pub use settings::{
    DispatchBackend, RuntimeEngine, RuntimeSettings, RuntimeSettingsFile, SettingsError,
};
pub use succession::{SuccessionManager, SuccessionTakeover};
