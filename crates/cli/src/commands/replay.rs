// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replay command handler: print the tail of either append-only ledger.

use crate::exit_error::ExitError;
use crate::store::open_store;
use clap::{Args, ValueEnum};
use daokit_storage::StateBackend;
use serde_json::json;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReplaySource {
    Events,
    Snapshots,
}

#[derive(Args)]
pub struct ReplayArgs {
    /// Repository root path
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
    /// Replay source
    #[arg(long, value_enum, default_value_t = ReplaySource::Events)]
    pub source: ReplaySource,
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
    /// Print JSON payload
    #[arg(long)]
    pub json: bool,
}

pub fn handle(args: ReplayArgs) -> Result<i32, ExitError> {
    let store = open_store(&args.root, "E_REPLAY_FAILED")?;
    let limit = args.limit.max(1);

    match args.source {
        ReplaySource::Events => {
            let events = store
                .list_events()
                .map_err(|error| ExitError::failure("E_REPLAY_FAILED", error))?;
            let tail = &events[events.len().saturating_sub(limit)..];
            if args.json {
                println!("{}", serde_json::to_string_pretty(&json!(tail)).unwrap_or_default());
                return Ok(0);
            }
            if tail.is_empty() {
                println!("No events entries recorded.");
                return Ok(0);
            }
            for event in tail {
                println!(
                    "{} {} step={} severity={}",
                    event.timestamp.to_rfc3339(),
                    event.event_type,
                    event.step_id.as_deref().unwrap_or("-"),
                    event.severity
                );
            }
        }
        ReplaySource::Snapshots => {
            let snapshots = store
                .list_snapshots()
                .map_err(|error| ExitError::failure("E_REPLAY_FAILED", error))?;
            let tail = &snapshots[snapshots.len().saturating_sub(limit)..];
            if args.json {
                println!("{}", serde_json::to_string_pretty(&json!(tail)).unwrap_or_default());
                return Ok(0);
            }
            if tail.is_empty() {
                println!("No snapshots entries recorded.");
                return Ok(0);
            }
            for snapshot in tail {
                println!(
                    "{} {} from={} to={}",
                    snapshot.timestamp.to_rfc3339(),
                    snapshot.node.as_deref().unwrap_or("-"),
                    snapshot.from_status.map(|status| status.as_str()).unwrap_or("-"),
                    snapshot.to_status.map(|status| status.as_str()).unwrap_or("-")
                );
            }
        }
    }
    Ok(0)
}
