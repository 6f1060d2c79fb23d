// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Takeover command handler

use crate::exit_error::ExitError;
use crate::store::open_store;
use clap::Args;
use daokit_core::SystemClock;
use daokit_engine::SuccessionManager;
use daokit_storage::StateBackend;
use std::path::PathBuf;

#[derive(Args)]
pub struct TakeoverArgs {
    /// Repository root path
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
    /// Task id to recover (defaults to the ledger's task)
    #[arg(long)]
    pub task_id: Option<String>,
    /// Run id to recover (defaults to the ledger's run)
    #[arg(long)]
    pub run_id: Option<String>,
    /// Successor thread id
    #[arg(long)]
    pub successor_thread_id: Option<String>,
    #[arg(long, default_value_t = std::process::id())]
    pub successor_pid: u32,
    /// Optional TTL override for adopted leases
    #[arg(long)]
    pub lease_ttl: Option<u64>,
}

pub fn handle(args: TakeoverArgs) -> Result<i32, ExitError> {
    let store = open_store(&args.root, "E_TAKEOVER_FAILED")?;
    let state = store
        .load_state()
        .map_err(|error| ExitError::failure("E_TAKEOVER_FAILED", error))?;

    let task_id = args
        .task_id
        .clone()
        .or_else(|| state.task_id.clone())
        .ok_or_else(|| ExitError::failure("E_TAKEOVER_FAILED", "task id is required for takeover"))?;
    let run_id = args
        .run_id
        .clone()
        .or_else(|| state.run_id.clone())
        .ok_or_else(|| ExitError::failure("E_TAKEOVER_FAILED", "run id is required for takeover"))?;

    let successor_thread_id = args
        .successor_thread_id
        .clone()
        .unwrap_or_else(|| format!("takeover-{}", std::process::id()));

    let manager = SuccessionManager::new(task_id, run_id, store, SystemClock);
    let result = manager
        .accept_successor(&successor_thread_id, args.successor_pid, args.lease_ttl)
        .map_err(|error| ExitError::failure("E_TAKEOVER_FAILED", error))?;

    println!("{}", serde_json::to_string_pretty(&result).unwrap_or_default());
    Ok(0)
}
