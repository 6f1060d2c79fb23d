// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! daokit: operator CLI for the DAOKit orchestration runtime.

mod commands;
mod exit_error;
mod store;

use clap::{Parser, Subcommand};
use exit_error::ExitError;

#[derive(Parser)]
#[command(name = "daokit", version, about = "DAOKit workflow and operator recovery commands")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize repository layout and state files
    Init(commands::init::InitArgs),
    /// Validate runtime state and heartbeat health
    Check(commands::check::CheckArgs),
    /// Run the orchestrator workflow
    Run(commands::run::RunArgs),
    /// Show ledger, heartbeat, lease, and handoff status
    Status(commands::status::StatusArgs),
    /// Replay events or snapshots from the state ledger
    Replay(commands::replay::ReplayArgs),
    /// Adopt running leases after an interruption
    Takeover(commands::takeover::TakeoverArgs),
    /// Create or apply a handoff package
    Handoff(commands::handoff::HandoffArgs),
}

async fn dispatch(cli: Cli) -> Result<i32, ExitError> {
    match cli.command {
        Command::Init(args) => commands::init::handle(args),
        Command::Check(args) => commands::check::handle(args).await,
        Command::Run(args) => commands::run::handle(args),
        Command::Status(args) => commands::status::handle(args),
        Command::Replay(args) => commands::replay::handle(args),
        Command::Takeover(args) => commands::takeover::handle(args),
        Command::Handoff(args) => commands::handoff::handle(args),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{error}");
            error.code
        }
    };
    std::process::exit(code);
}
