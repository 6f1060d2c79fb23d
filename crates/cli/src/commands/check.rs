// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Check command handler: heartbeat health with exit code 2 on STALE.

use crate::exit_error::ExitError;
use crate::store::{open_store, resolve_path};
use chrono::Utc;
use clap::Args;
use daokit_core::{HeartbeatState, SystemClock};
use daokit_engine::{
    evaluate_heartbeat, latest_artifact_mtime, supervise, HeartbeatDaemon, HeartbeatPhase,
    HeartbeatThresholds,
};
use daokit_storage::StateBackend;
use serde_json::json;
use std::path::PathBuf;

/// Pipeline or heartbeat statuses that count as an active run.
const RUN_ACTIVE_STATUSES: [&str; 9] = [
    "ANALYSIS", "FREEZE", "EXECUTE", "ACCEPT", "DRAINING", "BLOCKED", "RUNNING", "WARNING",
    "STALE",
];

#[derive(Args)]
pub struct CheckArgs {
    /// Repository root path
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
    /// Artifacts directory (relative to root unless absolute)
    #[arg(long, default_value = "artifacts")]
    pub artifact_root: String,
    #[arg(long, default_value_t = 300)]
    pub check_interval: u64,
    #[arg(long, default_value_t = 900)]
    pub warning_after: u64,
    #[arg(long, default_value_t = 1200)]
    pub stale_after: u64,
    /// Print JSON payload
    #[arg(long)]
    pub json: bool,
    /// Keep ticking the heartbeat daemon at the check interval
    #[arg(long)]
    pub watch: bool,
}

pub async fn handle(args: CheckArgs) -> Result<i32, ExitError> {
    let store = open_store(&args.root, "E_CHECK_STATE_INVALID")?;
    let thresholds =
        HeartbeatThresholds::new(args.check_interval, args.warning_after, args.stale_after)
            .map_err(|error| ExitError::failure("E_CHECK_HEARTBEAT_INVALID", error))?;

    let pipeline_state = store
        .load_state()
        .map_err(|error| ExitError::failure("E_CHECK_STATE_INVALID", error))?;
    let heartbeat_status = store
        .load_heartbeat_status()
        .map_err(|error| ExitError::failure("E_CHECK_STATE_INVALID", error))?;
    let leases = store
        .load_leases()
        .map_err(|error| ExitError::failure("E_CHECK_STATE_INVALID", error))?;

    let artifact_root = resolve_path(&args.root, &args.artifact_root);

    if args.watch {
        let daemon = HeartbeatDaemon::new(
            pipeline_state.task_id.clone().unwrap_or_else(|| "unknown".to_string()),
            pipeline_state.run_id.clone().unwrap_or_else(|| "unknown".to_string()),
            pipeline_state.current_step.clone().unwrap_or_else(|| "unknown".to_string()),
            store,
            artifact_root,
            thresholds,
            SystemClock,
        );
        supervise(&daemon, None, |tick| {
            println!(
                "heartbeat={} silence_seconds={} reason={}",
                tick.state,
                tick.silence_seconds,
                tick.reason_code.as_deref().unwrap_or("-")
            );
        })
        .await
        .map_err(|error| ExitError::failure("E_CHECK_FAILED", error))?;
        return Ok(0);
    }

    let execution_active =
        RUN_ACTIVE_STATUSES.contains(&pipeline_state.status.as_str());
    let evaluation = evaluate_heartbeat(
        Utc::now(),
        execution_active,
        &thresholds,
        heartbeat_status.last_heartbeat_at,
        latest_artifact_mtime(&artifact_root),
    );

    let stale = evaluation.phase == HeartbeatPhase::Stale;
    let payload = json!({
        "health": if stale { "WARN" } else { "PASS" },
        "pipeline_status": pipeline_state.status,
        "heartbeat": {
            "status": if stale { HeartbeatState::Stale } else { heartbeat_status.status },
            "reason_code": evaluation.reason_code,
            "silence_seconds": evaluation.silence_seconds,
        },
        "lease_count": leases.leases.len(),
    });

    if args.json {
        println!("{}", serde_json::to_string_pretty(&payload).unwrap_or_default());
    } else {
        println!("Health check: {}", payload["health"].as_str().unwrap_or("-"));
        println!("pipeline_status={}", pipeline_state.status);
        println!(
            "heartbeat={} silence_seconds={}",
            payload["heartbeat"]["status"].as_str().unwrap_or("-"),
            evaluation.silence_seconds
        );
        println!("lease_count={}", leases.leases.len());
    }

    if stale {
        return Ok(2);
    }
    Ok(0)
}
