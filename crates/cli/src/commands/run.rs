// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run command handler: drives the orchestrator under a process lease.

use crate::exit_error::ExitError;
use crate::store::{open_store, resolve_path, resolve_settings, Store};
use clap::Args;
use daokit_core::SystemClock;
use daokit_engine::{LeaseKey, LeaseRegistry, OrchestratorRuntime, RegisterLease, RuntimeConfig};
use daokit_planner::{compile_plan, PlanPayload};
use daokit_storage::StateBackend;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Args)]
pub struct RunArgs {
    /// Repository root path
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
    #[arg(long)]
    pub task_id: String,
    /// Run identifier (auto-generated when omitted)
    #[arg(long)]
    pub run_id: Option<String>,
    #[arg(long)]
    pub goal: String,
    #[arg(long, default_value = "S1")]
    pub step_id: String,
    #[arg(long, default_value = "default")]
    pub lane: String,
    /// Lease owner thread id
    #[arg(long)]
    pub thread_id: Option<String>,
    #[arg(long, default_value_t = 1200)]
    pub lease_ttl: u64,
    /// Plan payload file compiled into the ledger's step contracts
    #[arg(long)]
    pub plan: Option<String>,
    /// Evidence root for the verify node (enables acceptance evaluation)
    #[arg(long)]
    pub evidence_root: Option<String>,
    /// Leave the lease ACTIVE and exit with the interruption code
    #[arg(long)]
    pub simulate_interruption: bool,
    /// Run the workflow without registering a process lease
    #[arg(long)]
    pub no_lease: bool,
}

pub fn handle(args: RunArgs) -> Result<i32, ExitError> {
    let store = open_store(&args.root, "E_RUN_FAILED")?;
    // Settings are resolved up front so an unsupported backend or engine
    // fails fast even though the executors themselves are pluggable.
    let _settings = resolve_settings(&args.root, "E_RUN_FAILED")?;

    let run_id = args.run_id.clone().unwrap_or_else(|| generate_run_id(&args.task_id));

    if let Some(plan_path) = &args.plan {
        seed_compiled_plan(&store, &args, &run_id, &resolve_path(&args.root, plan_path))?;
    }

    let mut config =
        RuntimeConfig::new(&args.task_id, &run_id, &args.goal, store.clone())
            .step_id(&args.step_id);
    if let Some(evidence_root) = &args.evidence_root {
        config = config.evidence_root(resolve_path(&args.root, evidence_root));
    }
    let runtime = OrchestratorRuntime::new(config)
        .map_err(|error| ExitError::failure("E_RUN_FAILED", error))?;

    let registry = LeaseRegistry::new(store, SystemClock);
    let lease = if args.no_lease {
        None
    } else {
        let record = registry
            .register(RegisterLease {
                lane: args.lane.clone(),
                step_id: args.step_id.clone(),
                task_id: args.task_id.clone(),
                run_id: run_id.clone(),
                thread_id: args
                    .thread_id
                    .clone()
                    .unwrap_or_else(|| format!("cli-{}", std::process::id())),
                pid: std::process::id(),
                ttl_seconds: args.lease_ttl,
            })
            .map_err(|error| {
                ExitError::failure("E_RUN_FAILED", format!("unable to register lease: {error}"))
            })?;
        Some(record)
    };

    if args.simulate_interruption {
        eprintln!("E_RUN_INTERRUPTED: simulated interruption, lease left ACTIVE for takeover");
        return Ok(130);
    }

    let final_state =
        runtime.run().map_err(|error| ExitError::failure("E_RUN_FAILED", error))?;

    if let Some(record) = lease {
        // Best-effort release; an expired lease is fine to leave behind.
        let _ = registry.release(
            &LeaseKey {
                lease_token: record.lease_token,
                task_id: args.task_id.clone(),
                run_id: run_id.clone(),
                step_id: args.step_id.clone(),
            },
            None,
        );
    }

    println!(
        "task_id={} run_id={} status={} current_step={}",
        args.task_id,
        run_id,
        final_state.status,
        final_state.current_step.as_deref().unwrap_or("-")
    );
    Ok(0)
}

/// Compile the operator's plan payload and write its step contracts into
/// the ledger before the runtime bootstraps.
fn seed_compiled_plan(
    store: &Arc<Store>,
    args: &RunArgs,
    run_id: &str,
    plan_path: &std::path::Path,
) -> Result<(), ExitError> {
    let body = std::fs::read_to_string(plan_path)
        .map_err(|error| ExitError::failure("E_RUN_FAILED", error))?;
    let mut payload: PlanPayload = serde_json::from_str(&body)
        .map_err(|error| ExitError::failure("E_RUN_FAILED", error))?;
    // The command-line identifiers are authoritative for this run.
    payload.task_id = Some(args.task_id.clone());
    payload.run_id = Some(run_id.to_string());
    if payload.goal.is_none() {
        payload.goal = Some(args.goal.clone());
    }
    let plan = compile_plan(&payload)
        .map_err(|error| ExitError::failure("E_RUN_FAILED", error))?;

    let mut state = store
        .load_state()
        .map_err(|error| ExitError::failure("E_RUN_FAILED", error))?;
    let status = state.status;
    state.task_id = Some(plan.task_id);
    state.run_id = Some(plan.run_id);
    state.goal = plan.goal;
    state.steps = plan.steps;
    state.current_step = None;
    store
        .save_state(&state, Some("plan_import"), Some(status), Some(status))
        .map_err(|error| ExitError::failure("E_RUN_FAILED", error))?;
    Ok(())
}

fn generate_run_id(task_id: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{task_id}_{}", &suffix[..12])
}
