// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! daokit-storage: durable state ledger for the orchestration runtime.
//!
//! The file backend keeps one state root per run with atomic
//! write-to-temp-and-rename updates, an advisory lock serializing writers,
//! append-only event/snapshot logs, and per-run event deduplication.

mod backend;
mod bootstrap;
mod fs_store;
mod layout;

pub use backend::StateBackend;
pub use bootstrap::{initialize_repository, InitReport};
pub use fs_store::FsStateStore;
pub use layout::{
    EVENTS_FILE, HANDOFF_PACKAGE_FILE, HEARTBEAT_STATUS_FILE, PIPELINE_STATE_FILE,
    PROCESS_LEASES_FILE, RUNTIME_SETTINGS_FILE, SNAPSHOTS_FILE, STATE_DIR,
};

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the state store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{file} is not valid JSON: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{file} line {line} contains invalid JSON: {source}")]
    ParseLine {
        file: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("expected a file at '{0}', found a directory")]
    PathConflict(PathBuf),

    #[error("state root '{0}' collides with an existing file")]
    RootConflict(PathBuf),
}
