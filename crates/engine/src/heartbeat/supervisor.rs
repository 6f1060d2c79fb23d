// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic driver for the heartbeat daemon.

use crate::heartbeat::daemon::{HeartbeatDaemon, HeartbeatTick};
use crate::heartbeat::HeartbeatError;
use daokit_core::Clock;
use daokit_storage::StateBackend;
use std::time::Duration;

/// Drive `daemon.tick()` at the daemon's check interval.
///
/// Runs until `max_ticks` is reached (forever when `None`); each tick's
/// result is handed to `on_tick`. Tick errors propagate and stop the loop.
pub async fn supervise<S, C, F>(
    daemon: &HeartbeatDaemon<S, C>,
    max_ticks: Option<u64>,
    mut on_tick: F,
) -> Result<(), HeartbeatError>
where
    S: StateBackend,
    C: Clock,
    F: FnMut(&HeartbeatTick),
{
    let period = Duration::from_secs(daemon.thresholds().check_interval_seconds());
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first interval tick fires immediately; skip it so the first
    // evaluation happens one full period after startup.
    interval.tick().await;

    let mut completed = 0u64;
    loop {
        if let Some(limit) = max_ticks {
            if completed >= limit {
                return Ok(());
            }
        }
        interval.tick().await;
        let tick = daemon.tick()?;
        tracing::debug!(state = %tick.state, silence = tick.silence_seconds, "heartbeat tick");
        on_tick(&tick);
        completed += 1;
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
