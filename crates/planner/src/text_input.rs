// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The canonical minimal plan for plain text task input.

use daokit_core::StepContract;

/// Planner tag stamped on generated minimal-plan steps.
pub const TEXT_INPUT_PLANNER_SOURCE: &str = "text_input_minimal_v1";

fn normalize_goal(goal: &str) -> String {
    let trimmed = goal.trim();
    if trimmed.is_empty() {
        "Complete the requested text task".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parse the numeric suffix of an `S<n>` step id, defaulting to 1.
fn parse_step_index(step_id: &str) -> u32 {
    step_id
        .trim()
        .strip_prefix('S')
        .and_then(|digits| {
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                None
            } else {
                digits.parse::<u32>().ok()
            }
        })
        .map(|index| index.max(1))
        .unwrap_or(1)
}

/// Build the bounded 3-step analysis → implementation → verification plan.
///
/// Step ids continue from the caller's base id, so a runtime configured
/// with `S1` produces `S1, S2, S3`.
pub fn build_minimal_text_input_steps(goal: &str, step_id: &str) -> Vec<StepContract> {
    let normalized_goal = normalize_goal(goal);
    let base = parse_step_index(step_id);
    let id = |offset: u32| format!("S{}", base + offset);

    let first = id(0);
    let second = id(1);
    let third = id(2);

    vec![
        StepContract {
            id: first.clone(),
            title: "Extract actionable scope from text input".to_string(),
            category: "analysis".to_string(),
            goal: format!(
                "Translate text input into an executable implementation scope: {normalized_goal}"
            ),
            actions: vec![
                "Identify the smallest deliverable that satisfies the user request".to_string(),
                "Capture explicit constraints and non-goals from the text input".to_string(),
            ],
            acceptance_criteria: vec![
                "Task scope is concrete and implementation-ready".to_string(),
                "Constraints and exclusions are explicit".to_string(),
            ],
            expected_outputs: vec!["planning/scope-summary.md".to_string()],
            dependencies: Vec::new(),
            planner_source: Some(TEXT_INPUT_PLANNER_SOURCE.to_string()),
        },
        StepContract {
            id: second.clone(),
            title: "Implement the minimal viable change set".to_string(),
            category: "implementation".to_string(),
            goal: format!("Implement the bounded solution for: {normalized_goal}"),
            actions: vec![
                "Apply focused code changes for the requested behavior".to_string(),
                "Preserve compatibility constraints and existing public CLI surface".to_string(),
            ],
            acceptance_criteria: vec![
                "Requested behavior is implemented end-to-end".to_string(),
                "Compatibility constraints remain non-breaking".to_string(),
            ],
            expected_outputs: vec!["implementation/change-set.patch".to_string()],
            dependencies: vec![first],
            planner_source: Some(TEXT_INPUT_PLANNER_SOURCE.to_string()),
        },
        StepContract {
            id: third,
            title: "Verify and capture auditable evidence".to_string(),
            category: "verification".to_string(),
            goal: "Verify outcomes and capture reproducible validation evidence".to_string(),
            actions: vec![
                "Run validation commands required by repository standards".to_string(),
                "Record evidence paths and acceptance status for auditability".to_string(),
            ],
            acceptance_criteria: vec![
                "Validation commands complete with auditable outputs".to_string(),
                "Acceptance status is explicit and reproducible".to_string(),
            ],
            expected_outputs: vec![
                "report.md".to_string(),
                "verification.log".to_string(),
                "audit-summary.md".to_string(),
            ],
            dependencies: vec![second],
            planner_source: Some(TEXT_INPUT_PLANNER_SOURCE.to_string()),
        },
    ]
}

#[cfg(test)]
#[path = "text_input_tests.rs"]
mod tests;
