// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository bootstrap for the `init` operator command.

use crate::fs_store::FsStateStore;
use crate::layout::{
    EVENTS_FILE, HEARTBEAT_STATUS_FILE, PIPELINE_STATE_FILE, PROCESS_LEASES_FILE, SNAPSHOTS_FILE,
    STATE_DIR,
};
use crate::StoreError;
use daokit_core::Clock;
use std::fs;
use std::path::Path;

/// Which layout entries `init` created vs. found already in place.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InitReport {
    pub created: Vec<String>,
    pub skipped: Vec<String>,
}

/// Lay out `<root>/state/` with default payloads plus `<root>/artifacts/`.
///
/// Existing entries are left untouched and reported as skipped; an entry of
/// the wrong kind (file where a directory is expected, or vice versa) is a
/// typed conflict error.
pub fn initialize_repository<C: Clock>(root: &Path, clock: C) -> Result<InitReport, StoreError> {
    let mut report = InitReport::default();

    for dir in [STATE_DIR, "artifacts"] {
        let path = root.join(dir);
        if path.is_file() {
            return Err(StoreError::RootConflict(path));
        }
        if path.exists() {
            report.skipped.push(format!("{dir}/"));
        } else {
            fs::create_dir_all(&path)?;
            report.created.push(format!("{dir}/"));
        }
    }

    let state_root = root.join(STATE_DIR);
    let existing: Vec<String> = [
        PIPELINE_STATE_FILE,
        HEARTBEAT_STATUS_FILE,
        PROCESS_LEASES_FILE,
        EVENTS_FILE,
        SNAPSHOTS_FILE,
    ]
    .iter()
    .filter(|name| state_root.join(name).exists())
    .map(|name| name.to_string())
    .collect();

    // Opening the store seeds every missing file with its default payload.
    FsStateStore::open(&state_root, clock)?;

    for name in [
        PIPELINE_STATE_FILE,
        HEARTBEAT_STATUS_FILE,
        PROCESS_LEASES_FILE,
        EVENTS_FILE,
        SNAPSHOTS_FILE,
    ] {
        let label = format!("{STATE_DIR}/{name}");
        if existing.iter().any(|found| found == name) {
            report.skipped.push(label);
        } else {
            report.created.push(label);
        }
    }

    Ok(report)
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
