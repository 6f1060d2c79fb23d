// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! daokit-planner: compiles free-form goal payloads into strict step
//! contract sets with deterministic identifiers.

mod compile;
mod text_input;

pub use compile::{compile_plan, normalize_output_key, CompiledPlan, PlanPayload, RawStep};
pub use text_input::{build_minimal_text_input_steps, TEXT_INPUT_PLANNER_SOURCE};

use thiserror::Error;

/// Plan-contract violations. Each variant names the offending field and,
/// where applicable, the step index so callers can point at the input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("{path} must be a non-empty string")]
    EmptyField { path: String },

    #[error("steps must be a non-empty list")]
    EmptySteps,

    #[error("steps[{index}].{field} must contain at least 1 entry")]
    EmptyList { index: usize, field: &'static str },

    #[error("duplicate step id '{id}'")]
    DuplicateStepId { id: String },

    #[error(
        "expected output conflict across multiple steps: \
         {first_step}:{first_output} vs {second_step}:{second_output}"
    )]
    OutputConflict {
        first_step: String,
        first_output: String,
        second_step: String,
        second_output: String,
    },

    #[error("step '{id}' cannot depend on itself")]
    SelfDependency { id: String },

    #[error("step '{id}' depends on unknown step '{dependency}'")]
    UnknownDependency { id: String, dependency: String },

    #[error("dependency cycle detected: {blocked}")]
    DependencyCycle { blocked: String },
}
