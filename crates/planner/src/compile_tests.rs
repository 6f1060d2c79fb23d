// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::PlanError;
use yare::parameterized;

fn raw_step(id: &str) -> RawStep {
    RawStep {
        id: Some(id.to_string()),
        title: Some(format!("Step {id}")),
        category: Some("implementation".to_string()),
        goal: Some("do the work".to_string()),
        actions: vec!["act".to_string()],
        acceptance_criteria: vec!["passes".to_string()],
        expected_outputs: vec![format!("out/{id}.md")],
        dependencies: Vec::new(),
        planner_source: None,
    }
}

fn payload(steps: Vec<RawStep>) -> PlanPayload {
    PlanPayload { goal: Some("ship it".to_string()), steps, ..PlanPayload::default() }
}

#[test]
fn compiles_a_valid_two_step_plan() {
    let mut second = raw_step("S2");
    second.dependencies = vec!["S1".to_string()];
    let plan = compile_plan(&payload(vec![raw_step("S1"), second])).unwrap();

    assert_eq!(plan.goal, "ship it");
    assert_eq!(plan.steps.len(), 2);
    assert!(plan.task_id.starts_with("TASK-"));
    assert_eq!(plan.task_id.len(), "TASK-".len() + 12);
    assert!(plan.run_id.starts_with(&format!("{}_", plan.task_id)));
}

#[test]
fn derived_ids_are_deterministic_for_equal_content() {
    let first = compile_plan(&payload(vec![raw_step("S1")])).unwrap();
    let second = compile_plan(&payload(vec![raw_step("S1")])).unwrap();
    assert_eq!(first.task_id, second.task_id);
    assert_eq!(first.run_id, second.run_id);

    let different = compile_plan(&PlanPayload {
        goal: Some("another goal".to_string()),
        steps: vec![raw_step("S1")],
        ..PlanPayload::default()
    })
    .unwrap();
    assert_ne!(first.task_id, different.task_id);
}

#[test]
fn provided_ids_are_kept_verbatim() {
    let plan = compile_plan(&PlanPayload {
        goal: Some("g".to_string()),
        steps: vec![raw_step("S1")],
        task_id: Some("DKT-HP".to_string()),
        run_id: Some("HP-1".to_string()),
        ..PlanPayload::default()
    })
    .unwrap();
    assert_eq!(plan.task_id, "DKT-HP");
    assert_eq!(plan.run_id, "HP-1");
}

#[test]
fn missing_goal_is_rejected() {
    let err = compile_plan(&PlanPayload {
        goal: Some("   ".to_string()),
        steps: vec![raw_step("S1")],
        ..PlanPayload::default()
    })
    .unwrap_err();
    assert_eq!(err, PlanError::EmptyField { path: "goal".to_string() });
}

#[test]
fn empty_steps_are_rejected() {
    assert_eq!(compile_plan(&payload(Vec::new())).unwrap_err(), PlanError::EmptySteps);
}

#[parameterized(
    id = { "id" },
    title = { "title" },
    category = { "category" },
    goal = { "goal" },
)]
fn missing_required_string_names_field_and_index(field: &str) {
    let mut step = raw_step("S1");
    match field {
        "id" => step.id = None,
        "title" => step.title = Some(String::new()),
        "category" => step.category = None,
        _ => step.goal = Some("  ".to_string()),
    }
    let err = compile_plan(&payload(vec![raw_step("S0"), step])).unwrap_err();
    assert_eq!(err, PlanError::EmptyField { path: format!("steps[1].{field}") });
}

#[parameterized(
    actions = { "actions" },
    criteria = { "acceptance_criteria" },
    outputs = { "expected_outputs" },
)]
fn empty_list_fields_are_rejected(field: &str) {
    let mut step = raw_step("S1");
    match field {
        "actions" => step.actions.clear(),
        "acceptance_criteria" => step.acceptance_criteria.clear(),
        _ => step.expected_outputs.clear(),
    }
    let err = compile_plan(&payload(vec![step])).unwrap_err();
    match err {
        PlanError::EmptyList { index: 0, field: found } => assert_eq!(found, field),
        other => panic!("expected EmptyList, got {other:?}"),
    }
}

#[test]
fn duplicate_step_ids_are_rejected() {
    let err = compile_plan(&payload(vec![raw_step("S1"), raw_step("S1")])).unwrap_err();
    assert_eq!(err, PlanError::DuplicateStepId { id: "S1".to_string() });
}

#[test]
fn normalized_output_conflicts_are_detected_across_steps() {
    let mut first = raw_step("S1");
    first.expected_outputs = vec!["reports/summary.md".to_string()];
    let mut second = raw_step("S2");
    second.expected_outputs = vec!["reports\\./summary.md".to_string()];

    let err = compile_plan(&payload(vec![first, second])).unwrap_err();
    match err {
        PlanError::OutputConflict { first_step, second_step, .. } => {
            assert_eq!(first_step, "S1");
            assert_eq!(second_step, "S2");
        }
        other => panic!("expected OutputConflict, got {other:?}"),
    }
}

#[test]
fn self_dependency_is_rejected() {
    let mut step = raw_step("S1");
    step.dependencies = vec!["S1".to_string()];
    let err = compile_plan(&payload(vec![step])).unwrap_err();
    assert_eq!(err, PlanError::SelfDependency { id: "S1".to_string() });
}

#[test]
fn unknown_dependency_is_rejected_unless_declared_external() {
    let mut step = raw_step("S1");
    step.dependencies = vec!["DKT-002".to_string()];

    let err = compile_plan(&payload(vec![step.clone()])).unwrap_err();
    assert_eq!(
        err,
        PlanError::UnknownDependency { id: "S1".to_string(), dependency: "DKT-002".to_string() }
    );

    let plan = compile_plan(&PlanPayload {
        goal: Some("g".to_string()),
        steps: vec![step],
        dependencies: Some(vec!["DKT-002".to_string()]),
        ..PlanPayload::default()
    })
    .unwrap();
    assert_eq!(plan.steps[0].dependencies, vec!["DKT-002".to_string()]);
}

#[test]
fn dependency_cycles_name_the_blocked_steps() {
    let mut first = raw_step("S1");
    first.dependencies = vec!["S2".to_string()];
    let mut second = raw_step("S2");
    second.dependencies = vec!["S1".to_string()];

    let err = compile_plan(&payload(vec![first, second])).unwrap_err();
    assert_eq!(err, PlanError::DependencyCycle { blocked: "S1, S2".to_string() });
}

#[test]
fn long_dependency_chains_pass_kahn() {
    let steps: Vec<RawStep> = (1..=6)
        .map(|n| {
            let mut step = raw_step(&format!("S{n}"));
            if n > 1 {
                step.dependencies = vec![format!("S{}", n - 1)];
            }
            step
        })
        .collect();
    assert!(compile_plan(&payload(steps)).is_ok());
}

#[parameterized(
    backslashes = { "a\\b\\c.md", "a/b/c.md" },
    dot_segments = { "a/./b/../c.md", "a/c.md" },
    leading_dot = { "./report.md", "report.md" },
    collapse_to_dot = { "a/..", "." },
    keeps_parent_escape = { "../shared.md", "../shared.md" },
    absolute = { "/var/log/./x", "/var/log/x" },
)]
fn output_key_normalization(input: &str, expected: &str) {
    assert_eq!(normalize_output_key(input), expected);
}
