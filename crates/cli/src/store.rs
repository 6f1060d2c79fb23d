// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared store plumbing for commands.

use crate::exit_error::ExitError;
use daokit_core::SystemClock;
use daokit_engine::{RuntimeSettings, RuntimeSettingsFile};
use daokit_storage::{FsStateStore, RUNTIME_SETTINGS_FILE, STATE_DIR};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type Store = FsStateStore<SystemClock>;

/// Open (creating if needed) the state store under `<root>/state/`.
pub fn open_store(root: &Path, tag: &str) -> Result<Arc<Store>, ExitError> {
    FsStateStore::open(root.join(STATE_DIR), SystemClock)
        .map(Arc::new)
        .map_err(|error| ExitError::failure(tag, error))
}

/// Resolve runtime settings from the process environment plus the optional
/// `state/runtime_settings.json`.
pub fn resolve_settings(root: &Path, tag: &str) -> Result<RuntimeSettings, ExitError> {
    let env: HashMap<String, String> = std::env::vars().collect();
    let path = root.join(STATE_DIR).join(RUNTIME_SETTINGS_FILE);
    let file: Option<RuntimeSettingsFile> = if path.is_file() {
        let body = std::fs::read_to_string(&path)
            .map_err(|error| ExitError::failure(tag, error))?;
        Some(serde_json::from_str(&body).map_err(|error| ExitError::failure(tag, error))?)
    } else {
        None
    };
    RuntimeSettings::resolve(&env, file.as_ref()).map_err(|error| ExitError::failure(tag, error))
}

/// Resolve a possibly relative path against the repository root.
pub fn resolve_path(root: &Path, raw: &str) -> PathBuf {
    let candidate = PathBuf::from(raw);
    if candidate.is_absolute() {
        candidate
    } else {
        root.join(candidate)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
