// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Init command handler

use crate::exit_error::ExitError;
use clap::Args;
use daokit_core::SystemClock;
use daokit_storage::initialize_repository;
use std::path::PathBuf;

#[derive(Args)]
pub struct InitArgs {
    /// Repository root path
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
}

pub fn handle(args: InitArgs) -> Result<i32, ExitError> {
    let report = initialize_repository(&args.root, SystemClock)
        .map_err(|error| ExitError::failure("E_INIT_FAILED", error))?;

    println!("Initialized DAOKit skeleton at: {}", args.root.display());
    if !report.created.is_empty() {
        println!("Created:");
        for item in &report.created {
            println!("  + {item}");
        }
    }
    if !report.skipped.is_empty() {
        println!("Unchanged:");
        for item in &report.skipped {
            println!("  = {item}");
        }
    }
    Ok(0)
}
