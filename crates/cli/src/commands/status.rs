// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status command handler

use crate::exit_error::ExitError;
use crate::store::open_store;
use clap::Args;
use daokit_core::SystemClock;
use daokit_engine::{HandoffStore, LeaseRegistry};
use daokit_storage::{StateBackend, HANDOFF_PACKAGE_FILE, STATE_DIR};
use serde_json::json;
use std::path::PathBuf;

#[derive(Args)]
pub struct StatusArgs {
    /// Repository root path
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
    /// Filter leases by task id (defaults to the ledger's task)
    #[arg(long)]
    pub task_id: Option<String>,
    /// Filter leases by run id (defaults to the ledger's run)
    #[arg(long)]
    pub run_id: Option<String>,
    /// Print JSON payload
    #[arg(long)]
    pub json: bool,
}

pub fn handle(args: StatusArgs) -> Result<i32, ExitError> {
    let store = open_store(&args.root, "E_STATUS_FAILED")?;

    let pipeline_state = store
        .load_state()
        .map_err(|error| ExitError::failure("E_STATUS_FAILED", error))?;
    let heartbeat_status = store
        .load_heartbeat_status()
        .map_err(|error| ExitError::failure("E_STATUS_FAILED", error))?;

    let task_filter = args.task_id.clone().or_else(|| pipeline_state.task_id.clone());
    let run_filter = args.run_id.clone().or_else(|| pipeline_state.run_id.clone());
    let leases = LeaseRegistry::new(store, SystemClock)
        .list_leases(task_filter.as_deref(), run_filter.as_deref())
        .map_err(|error| ExitError::failure("E_STATUS_FAILED", error))?;

    let handoff_store = HandoffStore::new(
        args.root.join(STATE_DIR).join(HANDOFF_PACKAGE_FILE),
        SystemClock,
    );
    let handoff_package = handoff_store
        .load_package()
        .map_err(|error| ExitError::failure("E_STATUS_FAILED", error))?;

    if args.json {
        let payload = json!({
            "pipeline_state": pipeline_state,
            "heartbeat_status": heartbeat_status,
            "leases": leases,
            "handoff_package": handoff_package,
        });
        println!("{}", serde_json::to_string_pretty(&payload).unwrap_or_default());
    } else {
        println!(
            "task_id={} run_id={} status={} current_step={} heartbeat={} leases={} handoff={}",
            pipeline_state.task_id.as_deref().unwrap_or("-"),
            pipeline_state.run_id.as_deref().unwrap_or("-"),
            pipeline_state.status,
            pipeline_state.current_step.as_deref().unwrap_or("-"),
            heartbeat_status.status,
            leases.len(),
            if handoff_package.is_some() { "yes" } else { "no" }
        );
    }
    Ok(0)
}
