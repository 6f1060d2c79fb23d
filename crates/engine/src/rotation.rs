// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Context-rotation hooks: bridge pre-compact and session-start lifecycle
//! points to the handoff package store.

use crate::handoff::HandoffStore;
use crate::hooks::{HookError, HookPoint, HookRuntime};
use daokit_core::{Clock, TaskRun};
use serde_json::Value;
use std::sync::Arc;

pub const PRE_COMPACT_HOOK_NAME: &str = "core-rotation-handoff#pre-compact";
pub const SESSION_START_HOOK_NAME: &str = "core-rotation-handoff#session-start";

/// Register the deterministic rotation hooks:
///
/// - pre-compact writes a handoff package from the working ledger and
///   records its path and hash in `role_lifecycle`;
/// - session-start reconciles an existing package into the ledger (a
///   missing package is a no-op, so fresh sessions start clean).
pub fn register_rotation_hooks<C, H>(
    runtime: &mut HookRuntime<H>,
    handoff_store: Arc<HandoffStore<C>>,
    include_accepted_steps: bool,
) -> Result<(), HookError>
where
    C: Clock + 'static,
    H: Clock,
{
    let write_store = handoff_store.clone();
    runtime.register(
        HookPoint::PreCompact,
        PRE_COMPACT_HOOK_NAME,
        Box::new(move |ledger, context| {
            let mut state = parse_ledger(ledger)?;
            let evidence_paths = string_list(context.get("evidence_paths"));
            let include_accepted = resolve_include_accepted(context, include_accepted_steps);

            let package = write_store
                .write_package(&state, evidence_paths.as_deref(), include_accepted)
                .map_err(|error| error.to_string())?;

            let package_path =
                write_store.package_path().to_string_lossy().replace('\\', "/");
            state.role_lifecycle.set("handoff_package_path", package_path);
            state.role_lifecycle.set("handoff_package_hash", package.package_hash);
            store_ledger(ledger, &state)
        }),
        None,
        true,
    )?;

    runtime.register(
        HookPoint::SessionStart,
        SESSION_START_HOOK_NAME,
        Box::new(move |ledger, context| {
            let package = handoff_store.load_package().map_err(|error| error.to_string())?;
            if package.is_none() {
                return Ok(());
            }

            let mut state = parse_ledger(ledger)?;
            let include_accepted = resolve_include_accepted(context, include_accepted_steps);
            handoff_store
                .apply_package(&mut state, include_accepted)
                .map_err(|error| error.to_string())?;
            store_ledger(ledger, &state)
        }),
        None,
        true,
    )?;

    Ok(())
}

fn parse_ledger(ledger: &Value) -> Result<TaskRun, String> {
    serde_json::from_value(ledger.clone())
        .map_err(|error| format!("ledger is not a valid task run: {error}"))
}

fn store_ledger(ledger: &mut Value, state: &TaskRun) -> Result<(), String> {
    *ledger = serde_json::to_value(state)
        .map_err(|error| format!("task run is not serializable: {error}"))?;
    Ok(())
}

fn resolve_include_accepted(context: &Value, default: bool) -> bool {
    context
        .get("include_accepted_steps")
        .and_then(Value::as_bool)
        .unwrap_or(default)
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    let items = value?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    )
}

#[cfg(test)]
#[path = "rotation_tests.rs"]
mod tests;
