// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic lifecycle-hook dispatcher.
//!
//! Hooks run sequentially in registration order against a deep-copy
//! working ledger. A failing or timed-out hook reverts the run to the
//! original ledger and skips everything after it; idempotent hooks replay
//! cached results when the caller supplies an idempotency key.

use daokit_core::Clock;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Hook registration and invocation violations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HookError {
    #[error("unknown hook point '{value}'. expected one of: pre-dispatch, post-accept, pre-compact, session-start")]
    UnknownPoint { value: String },

    #[error("hook '{name}' is already registered at point '{point}'")]
    DuplicateName { name: String, point: HookPoint },

    #[error("{name} must be non-empty")]
    EmptyField { name: &'static str },

    #[error("{name} must be > 0")]
    NonPositiveTimeout { name: &'static str },
}

/// The four lifecycle points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    PreDispatch,
    PostAccept,
    PreCompact,
    SessionStart,
}

impl HookPoint {
    pub const ALL: [HookPoint; 4] =
        [HookPoint::PreDispatch, HookPoint::PostAccept, HookPoint::PreCompact, HookPoint::SessionStart];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookPoint::PreDispatch => "pre-dispatch",
            HookPoint::PostAccept => "post-accept",
            HookPoint::PreCompact => "pre-compact",
            HookPoint::SessionStart => "session-start",
        }
    }

    /// Parse a point name; underscores are accepted as separators.
    pub fn parse(value: &str) -> Result<Self, HookError> {
        match value.trim().replace('_', "-").to_lowercase().as_str() {
            "pre-dispatch" => Ok(HookPoint::PreDispatch),
            "post-accept" => Ok(HookPoint::PostAccept),
            "pre-compact" => Ok(HookPoint::PreCompact),
            "session-start" => Ok(HookPoint::SessionStart),
            other => Err(HookError::UnknownPoint { value: other.to_string() }),
        }
    }
}

impl std::fmt::Display for HookPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hook body: mutates the working ledger, reads the context. An `Err`
/// aborts the run and rolls the ledger back.
pub type HookCallback = Box<dyn Fn(&mut Value, &Value) -> Result<(), String> + Send + Sync>;

struct RegisteredHook {
    name: String,
    callback: HookCallback,
    timeout: Option<Duration>,
    idempotent: bool,
}

/// Per-hook execution record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookExecutionEntry {
    pub hook_name: String,
    pub hook_point: HookPoint,
    pub status: HookEntryStatus,
    pub duration: Duration,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEntryStatus {
    Success,
    Skipped,
    Error,
    Timeout,
    TimeoutBudgetExceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookRunStatus {
    Success,
    Error,
    Timeout,
}

/// Result of one `run`: the canonical next ledger plus the entry log.
#[derive(Debug)]
pub struct HookRunResult {
    pub hook_point: HookPoint,
    pub idempotency_key: Option<String>,
    pub status: HookRunStatus,
    pub ledger_state: Value,
    pub entries: Vec<HookExecutionEntry>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
}

/// Lifecycle hook engine with idempotency and transactional ledger
/// protection. The idempotency cache lives inside the instance.
pub struct HookRuntime<C: Clock> {
    default_timeout: Option<Duration>,
    hooks: HashMap<HookPoint, Vec<RegisteredHook>>,
    idempotency_cache: HashMap<(HookPoint, String, String), Value>,
    clock: C,
}

impl<C: Clock> HookRuntime<C> {
    pub fn new(clock: C, default_timeout: Option<Duration>) -> Self {
        let mut hooks = HashMap::new();
        for point in HookPoint::ALL {
            hooks.insert(point, Vec::new());
        }
        Self { default_timeout, hooks, idempotency_cache: HashMap::new(), clock }
    }

    /// Register a hook at a point. Duplicate names per point are refused.
    pub fn register(
        &mut self,
        point: HookPoint,
        name: &str,
        callback: HookCallback,
        timeout: Option<Duration>,
        idempotent: bool,
    ) -> Result<(), HookError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(HookError::EmptyField { name: "hook_name" });
        }
        if let Some(timeout) = timeout {
            if timeout.is_zero() {
                return Err(HookError::NonPositiveTimeout { name: "timeout" });
            }
        }

        let registered = self.hooks.entry(point).or_default();
        if registered.iter().any(|hook| hook.name == name) {
            return Err(HookError::DuplicateName { name: name.to_string(), point });
        }
        registered.push(RegisteredHook { name: name.to_string(), callback, timeout, idempotent });
        Ok(())
    }

    /// Registered hook names, in registration order.
    pub fn list_registered(&self, point: HookPoint) -> Vec<String> {
        self.hooks
            .get(&point)
            .map(|hooks| hooks.iter().map(|hook| hook.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Run every hook at `point` sequentially. Callers must treat the
    /// returned `ledger_state` as the canonical next state.
    pub fn run(
        &mut self,
        point: HookPoint,
        ledger_state: &Value,
        context: &Value,
        idempotency_key: Option<&str>,
        timeout_budget: Option<Duration>,
    ) -> Result<HookRunResult, HookError> {
        let idempotency_key = match idempotency_key {
            Some(key) if key.trim().is_empty() => {
                return Err(HookError::EmptyField { name: "idempotency_key" });
            }
            Some(key) => Some(key.trim().to_string()),
            None => None,
        };
        if let Some(budget) = timeout_budget {
            if budget.is_zero() {
                return Err(HookError::NonPositiveTimeout { name: "timeout_budget" });
            }
        }

        let original = ledger_state.clone();
        let mut working = ledger_state.clone();
        let mut entries = Vec::new();
        let mut pending_cache: Vec<((HookPoint, String, String), Value)> = Vec::new();
        let started_at = self.clock.now_utc();
        let run_started = Instant::now();
        let mut run_status = HookRunStatus::Success;

        for hook in self.hooks.get(&point).map(Vec::as_slice).unwrap_or_default() {
            let elapsed_before = run_started.elapsed();
            if let Some(budget) = timeout_budget {
                if elapsed_before >= budget {
                    entries.push(HookExecutionEntry {
                        hook_name: hook.name.clone(),
                        hook_point: point,
                        status: HookEntryStatus::TimeoutBudgetExceeded,
                        duration: Duration::ZERO,
                        error: Some(format!(
                            "timeout budget exceeded before executing hook '{}'",
                            hook.name
                        )),
                    });
                    run_status = HookRunStatus::Timeout;
                    break;
                }
            }

            let cache_key = match (&idempotency_key, hook.idempotent) {
                (Some(key), true) => Some((point, hook.name.clone(), key.clone())),
                _ => None,
            };
            if let Some(key) = &cache_key {
                if let Some(cached) = self.idempotency_cache.get(key) {
                    working = cached.clone();
                    entries.push(HookExecutionEntry {
                        hook_name: hook.name.clone(),
                        hook_point: point,
                        status: HookEntryStatus::Skipped,
                        duration: Duration::ZERO,
                        error: None,
                    });
                    continue;
                }
            }

            let remaining_budget = timeout_budget.map(|budget| budget.saturating_sub(elapsed_before));
            let effective_timeout = match (hook.timeout.or(self.default_timeout), remaining_budget) {
                (Some(timeout), Some(remaining)) => Some(timeout.min(remaining)),
                (Some(timeout), None) => Some(timeout),
                (None, remaining) => remaining,
            };

            let hook_started = Instant::now();
            let outcome = (hook.callback)(&mut working, context);
            let duration = hook_started.elapsed();

            if let Err(message) = outcome {
                entries.push(HookExecutionEntry {
                    hook_name: hook.name.clone(),
                    hook_point: point,
                    status: HookEntryStatus::Error,
                    duration,
                    error: Some(message),
                });
                run_status = HookRunStatus::Error;
                break;
            }

            // Timeouts are advisory: checked after the hook returns.
            if let Some(timeout) = effective_timeout {
                if duration > timeout {
                    entries.push(HookExecutionEntry {
                        hook_name: hook.name.clone(),
                        hook_point: point,
                        status: HookEntryStatus::Timeout,
                        duration,
                        error: Some(format!(
                            "hook '{}' exceeded timeout of {:.6}s",
                            hook.name,
                            timeout.as_secs_f64()
                        )),
                    });
                    run_status = HookRunStatus::Timeout;
                    break;
                }
            }

            entries.push(HookExecutionEntry {
                hook_name: hook.name.clone(),
                hook_point: point,
                status: HookEntryStatus::Success,
                duration,
                error: None,
            });
            if let Some(key) = cache_key {
                pending_cache.push((key, working.clone()));
            }
        }

        let ledger_state = if run_status == HookRunStatus::Success {
            // Cache entries commit only when the whole run succeeded, so a
            // later failure never publishes a partial ledger.
            for (key, cached) in pending_cache {
                self.idempotency_cache.insert(key, cached);
            }
            working
        } else {
            original
        };

        Ok(HookRunResult {
            hook_point: point,
            idempotency_key,
            status: run_status,
            ledger_state,
            entries,
            started_at,
            finished_at: self.clock.now_utc(),
        })
    }
}

#[cfg(test)]
#[path = "hooks_tests.rs"]
mod tests;
