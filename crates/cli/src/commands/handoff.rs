// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handoff command handler

use crate::exit_error::ExitError;
use crate::store::{open_store, resolve_path};
use clap::Args;
use daokit_core::SystemClock;
use daokit_engine::HandoffStore;
use daokit_storage::StateBackend;
use std::path::PathBuf;

#[derive(Args)]
pub struct HandoffArgs {
    /// Repository root path
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
    /// Create a handoff package from the current ledger
    #[arg(long, conflicts_with = "apply")]
    pub create: bool,
    /// Apply the handoff package to the current ledger
    #[arg(long)]
    pub apply: bool,
    /// Handoff package path (relative to root unless absolute)
    #[arg(long, default_value = "state/handoff_package.json")]
    pub package_path: String,
    /// Include accepted steps in the resumable set
    #[arg(long)]
    pub include_accepted_steps: bool,
    /// Override evidence output paths (repeatable)
    #[arg(long = "evidence-path")]
    pub evidence_paths: Vec<String>,
}

pub fn handle(args: HandoffArgs) -> Result<i32, ExitError> {
    let store = open_store(&args.root, "E_HANDOFF_FAILED")?;
    let mut ledger = store
        .load_state()
        .map_err(|error| ExitError::failure("E_HANDOFF_FAILED", error))?;

    let package_path = resolve_path(&args.root, &args.package_path);
    let handoff_store = HandoffStore::new(package_path, SystemClock);

    if args.apply {
        let before_status = ledger.status;
        let plan = handoff_store
            .apply_package(&mut ledger, args.include_accepted_steps)
            .map_err(|error| ExitError::failure("E_HANDOFF_FAILED", error))?;
        store
            .save_state(&ledger, Some("cli_handoff_apply"), Some(before_status), Some(ledger.status))
            .map_err(|error| ExitError::failure("E_HANDOFF_FAILED", error))?;
        println!("{}", serde_json::to_string_pretty(&plan).unwrap_or_default());
        return Ok(0);
    }

    let evidence_paths =
        if args.evidence_paths.is_empty() { None } else { Some(args.evidence_paths.as_slice()) };
    let package = handoff_store
        .write_package(&ledger, evidence_paths, args.include_accepted_steps)
        .map_err(|error| ExitError::failure("E_HANDOFF_FAILED", error))?;
    println!("{}", serde_json::to_string_pretty(&package).unwrap_or_default());
    Ok(0)
}
