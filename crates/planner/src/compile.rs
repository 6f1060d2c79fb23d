// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan compilation: validation, conflict detection, and id derivation.

use crate::PlanError;
use daokit_core::{stable_hash, StepContract};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Raw compile input: a goal plus loosely-typed steps.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanPayload {
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub steps: Vec<RawStep>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
    /// Step ids owned by other plans that local steps may depend on.
    #[serde(default)]
    pub dependencies: Option<Vec<String>>,
}

/// One step as supplied by the caller; every field is validated before a
/// [`StepContract`] is minted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStep {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub expected_outputs: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub planner_source: Option<String>,
}

/// The canonical, cycle-free plan with stable identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPlan {
    pub task_id: String,
    pub run_id: String,
    pub goal: String,
    pub steps: Vec<StepContract>,
}

/// Validate a raw payload into a [`CompiledPlan`].
pub fn compile_plan(payload: &PlanPayload) -> Result<CompiledPlan, PlanError> {
    let goal = expect_non_empty(payload.goal.as_deref(), "goal")?;
    if payload.steps.is_empty() {
        return Err(PlanError::EmptySteps);
    }

    let steps: Vec<StepContract> = payload
        .steps
        .iter()
        .enumerate()
        .map(|(index, raw)| validate_step(raw, index))
        .collect::<Result<_, _>>()?;

    let external = parse_external_dependencies(payload.dependencies.as_deref())?;
    assert_unique_step_ids(&steps)?;
    assert_no_conflicting_outputs(&steps)?;
    assert_dependency_dag(&steps, &external)?;

    let task_id = match payload.task_id.as_deref() {
        Some(provided) => expect_non_empty(Some(provided), "task_id")?,
        None => {
            let digest = stable_hash(&json!({
                "goal": goal,
                "steps": dispatch_values(&steps),
            }));
            format!("TASK-{}", &digest[..12])
        }
    };
    let run_id = match payload.run_id.as_deref() {
        Some(provided) => expect_non_empty(Some(provided), "run_id")?,
        None => {
            let digest = stable_hash(&json!({
                "task_id": task_id,
                "goal": goal,
                "steps": dispatch_values(&steps),
            }));
            format!("{task_id}_{}", &digest[12..24])
        }
    };

    Ok(CompiledPlan { task_id, run_id, goal, steps })
}

fn validate_step(raw: &RawStep, index: usize) -> Result<StepContract, PlanError> {
    let path = |field: &str| format!("steps[{index}].{field}");
    let id = expect_non_empty(raw.id.as_deref(), &path("id"))?;
    let title = expect_non_empty(raw.title.as_deref(), &path("title"))?;
    let category = expect_non_empty(raw.category.as_deref(), &path("category"))?;
    let goal = expect_non_empty(raw.goal.as_deref(), &path("goal"))?;

    let actions = expect_list(&raw.actions, index, "actions")?;
    let acceptance_criteria = expect_list(&raw.acceptance_criteria, index, "acceptance_criteria")?;
    let expected_outputs = expect_list(&raw.expected_outputs, index, "expected_outputs")?;

    let mut dependencies = Vec::new();
    for (dep_index, dependency) in raw.dependencies.iter().enumerate() {
        let text = expect_non_empty(Some(dependency), &path(&format!("dependencies[{dep_index}]")))?;
        if !dependencies.contains(&text) {
            dependencies.push(text);
        }
    }

    Ok(StepContract {
        id,
        title,
        category,
        goal,
        actions,
        acceptance_criteria,
        expected_outputs,
        dependencies,
        planner_source: raw.planner_source.clone(),
    })
}

fn expect_non_empty(value: Option<&str>, path: &str) -> Result<String, PlanError> {
    let trimmed = value.unwrap_or("").trim();
    if trimmed.is_empty() {
        return Err(PlanError::EmptyField { path: path.to_string() });
    }
    Ok(trimmed.to_string())
}

fn expect_list(values: &[String], index: usize, field: &'static str) -> Result<Vec<String>, PlanError> {
    let mut out = Vec::new();
    for value in values {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(PlanError::EmptyField {
                path: format!("steps[{index}].{field}[{}]", out.len()),
            });
        }
        if !out.iter().any(|existing: &String| existing == trimmed) {
            out.push(trimmed.to_string());
        }
    }
    if out.is_empty() {
        return Err(PlanError::EmptyList { index, field });
    }
    Ok(out)
}

fn parse_external_dependencies(values: Option<&[String]>) -> Result<HashSet<String>, PlanError> {
    let mut out = HashSet::new();
    for (index, value) in values.unwrap_or_default().iter().enumerate() {
        out.insert(expect_non_empty(Some(value), &format!("dependencies[{index}]"))?);
    }
    Ok(out)
}

fn assert_unique_step_ids(steps: &[StepContract]) -> Result<(), PlanError> {
    let mut seen = HashSet::new();
    for step in steps {
        if !seen.insert(step.id.as_str()) {
            return Err(PlanError::DuplicateStepId { id: step.id.clone() });
        }
    }
    Ok(())
}

fn assert_no_conflicting_outputs(steps: &[StepContract]) -> Result<(), PlanError> {
    let mut owners: HashMap<String, (&str, &str)> = HashMap::new();
    for step in steps {
        for output in &step.expected_outputs {
            let normalized = normalize_output_key(output);
            if let Some((first_step, first_output)) = owners.get(normalized.as_str()) {
                return Err(PlanError::OutputConflict {
                    first_step: (*first_step).to_string(),
                    first_output: (*first_output).to_string(),
                    second_step: step.id.clone(),
                    second_output: output.clone(),
                });
            }
            owners.insert(normalized, (step.id.as_str(), output.as_str()));
        }
    }
    Ok(())
}

/// Kahn's algorithm over the in-plan dependency edges. External ids are
/// declared up front and excluded from the graph.
fn assert_dependency_dag(
    steps: &[StepContract],
    external: &HashSet<String>,
) -> Result<(), PlanError> {
    let step_ids: HashSet<&str> = steps.iter().map(|step| step.id.as_str()).collect();

    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for step in steps {
        let mut degree = 0;
        for dependency in &step.dependencies {
            if dependency == &step.id {
                return Err(PlanError::SelfDependency { id: step.id.clone() });
            }
            if !step_ids.contains(dependency.as_str()) {
                if external.contains(dependency) {
                    continue;
                }
                return Err(PlanError::UnknownDependency {
                    id: step.id.clone(),
                    dependency: dependency.clone(),
                });
            }
            degree += 1;
            dependents.entry(dependency.as_str()).or_default().push(step.id.as_str());
        }
        in_degree.insert(step.id.as_str(), degree);
    }

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut processed = 0;
    while let Some(current) = ready.pop_first() {
        processed += 1;
        for dependent in dependents.get(current).map(Vec::as_slice).unwrap_or_default() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }

    if processed != steps.len() {
        let mut blocked: Vec<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree > 0)
            .map(|(id, _)| *id)
            .collect();
        blocked.sort_unstable();
        return Err(PlanError::DependencyCycle { blocked: blocked.join(", ") });
    }
    Ok(())
}

/// Normalize an expected-output path for conflict detection: back-slashes
/// become forward-slashes, then `.` and `..` collapse POSIX-style.
pub fn normalize_output_key(value: &str) -> String {
    let unified = value.replace('\\', "/");
    let absolute = unified.starts_with('/');

    let mut parts: Vec<&str> = Vec::new();
    for part in unified.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(&"..")) || (parts.is_empty() && !absolute) {
                    parts.push("..");
                } else {
                    parts.pop();
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

fn dispatch_values(steps: &[StepContract]) -> Vec<Value> {
    steps.iter().map(dispatch_value).collect()
}

/// The hash-stable projection of a contract: the eight contract fields only.
fn dispatch_value(step: &StepContract) -> Value {
    json!({
        "id": step.id,
        "title": step.title,
        "category": step.category,
        "goal": step.goal,
        "actions": step.actions,
        "acceptance_criteria": step.acceptance_criteria,
        "expected_outputs": step.expected_outputs,
        "dependencies": step.dependencies,
    })
}

#[cfg(test)]
#[path = "compile_tests.rs"]
mod tests;
