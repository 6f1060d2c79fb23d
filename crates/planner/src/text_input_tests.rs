// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{compile_plan, PlanPayload, RawStep};
use yare::parameterized;

#[test]
fn builds_three_chained_steps_from_the_base_id() {
    let steps = build_minimal_text_input_steps("Add retry logic", "S1");
    assert_eq!(steps.len(), 3);
    assert_eq!(steps[0].id, "S1");
    assert_eq!(steps[1].id, "S2");
    assert_eq!(steps[2].id, "S3");
    assert!(steps[0].dependencies.is_empty());
    assert_eq!(steps[1].dependencies, vec!["S1".to_string()]);
    assert_eq!(steps[2].dependencies, vec!["S2".to_string()]);
    for step in &steps {
        assert_eq!(step.planner_source.as_deref(), Some(TEXT_INPUT_PLANNER_SOURCE));
    }
}

#[test]
fn goal_is_woven_into_analysis_and_implementation_steps() {
    let steps = build_minimal_text_input_steps("  Fix the parser  ", "S1");
    assert!(steps[0].goal.ends_with("Fix the parser"));
    assert!(steps[1].goal.ends_with("Fix the parser"));
    assert_eq!(steps[0].category, "analysis");
    assert_eq!(steps[1].category, "implementation");
    assert_eq!(steps[2].category, "verification");
}

#[test]
fn blank_goal_gets_the_default_text() {
    let steps = build_minimal_text_input_steps("   ", "S1");
    assert!(steps[0].goal.contains("Complete the requested text task"));
}

#[parameterized(
    plain = { "S4", "S4" },
    malformed = { "step-one", "S1" },
    zero = { "S0", "S1" },
    padded = { "  S7 ", "S7" },
)]
fn base_id_parsing(input: &str, expected_first: &str) {
    let steps = build_minimal_text_input_steps("goal", input);
    assert_eq!(steps[0].id, expected_first);
}

#[test]
fn generated_plan_compiles_cleanly() {
    let steps = build_minimal_text_input_steps("goal", "S1");
    let raw: Vec<RawStep> = steps
        .iter()
        .map(|step| RawStep {
            id: Some(step.id.clone()),
            title: Some(step.title.clone()),
            category: Some(step.category.clone()),
            goal: Some(step.goal.clone()),
            actions: step.actions.clone(),
            acceptance_criteria: step.acceptance_criteria.clone(),
            expected_outputs: step.expected_outputs.clone(),
            dependencies: step.dependencies.clone(),
            planner_source: step.planner_source.clone(),
        })
        .collect();
    let plan = compile_plan(&PlanPayload {
        goal: Some("goal".to_string()),
        steps: raw,
        ..PlanPayload::default()
    })
    .unwrap();
    assert_eq!(plan.steps.len(), 3);
}
