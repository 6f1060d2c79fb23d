// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Evidence-backed acceptance evaluation.
//!
//! Replaying the engine on identical inputs yields an identical decision:
//! the proof id is a content hash over the normalized evaluation payload.

use crate::acceptance::scope::audit_changed_files;
use daokit_core::{
    acceptance::stable_proof_id, sha256_hex, AcceptanceDecision, AcceptanceProof,
    AcceptanceStatus, CriterionResult, EvidenceRecord, FailureReason, ReasonCode,
    ReworkCriterion, ReworkPayload,
};
use serde_json::json;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Acceptance input violations and evidence read failures.
#[derive(Debug, Error)]
pub enum AcceptanceError {
    #[error("{name} must be a non-empty string")]
    EmptyField { name: String },

    #[error("{name} must contain at least 1 entry")]
    EmptyList { name: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One step evaluation request.
#[derive(Debug, Clone)]
pub struct StepEvaluation<'a> {
    pub task_id: &'a str,
    pub run_id: &'a str,
    pub step_id: &'a str,
    pub acceptance_criteria: &'a [String],
    pub expected_outputs: &'a [String],
    pub evidence_root: &'a Path,
    pub changed_files: Option<&'a [String]>,
    pub allowed_scope: Option<&'a [String]>,
}

const COMMAND_MARKERS: [&str; 2] = ["Command:", "COMMAND ENTRY"];

/// Evaluate a step against its claimed evidence.
pub fn evaluate_step(input: &StepEvaluation<'_>) -> Result<AcceptanceDecision, AcceptanceError> {
    let task_id = expect_non_empty(input.task_id, "task_id")?;
    let run_id = expect_non_empty(input.run_id, "run_id")?;
    let step_id = expect_non_empty(input.step_id, "step_id")?;
    let criteria = expect_string_list(input.acceptance_criteria, "acceptance_criteria")?;
    let outputs = expect_string_list(input.expected_outputs, "expected_outputs")?;

    let root = clean_path(&std::path::absolute(input.evidence_root)?);
    let (evidence, invalid_paths) = resolve_evidence(&outputs, &root)?;

    let criterion_ids: Vec<(String, String)> = criteria
        .iter()
        .enumerate()
        .map(|(index, criterion)| (format!("AC-{:03}", index + 1), criterion.clone()))
        .collect();
    let mut reasons_by_criterion: Vec<Vec<ReasonCode>> = vec![Vec::new(); criterion_ids.len()];
    let mut failure_reasons: Vec<FailureReason> = Vec::new();

    if !invalid_paths.is_empty() {
        let targets = match_criteria(
            &criterion_ids,
            &["evidence path", "evidence", "artifact"],
            &["output"],
        );
        for invalid in &invalid_paths {
            attach(
                &targets,
                FailureReason {
                    code: ReasonCode::InvalidEvidencePath,
                    message:
                        "expected output path escapes evidence root and cannot be used as evidence"
                            .to_string(),
                    details: invalid.clone(),
                },
                &mut reasons_by_criterion,
                &mut failure_reasons,
            );
        }
    }

    let invalid_names: Vec<&str> = invalid_paths
        .iter()
        .filter_map(|detail| detail["output_name"].as_str())
        .collect();
    let missing: Vec<&EvidenceRecord> = evidence
        .iter()
        .filter(|record| !record.exists && !invalid_names.contains(&record.output_name.as_str()))
        .collect();
    if !missing.is_empty() {
        let targets = match_criteria(&criterion_ids, &["missing evidence"], &["evidence"]);
        for record in missing {
            attach(
                &targets,
                FailureReason {
                    code: ReasonCode::MissingEvidence,
                    message: format!("required evidence is missing: {}", record.output_name),
                    details: json!({"missing_output": record.output_name}),
                },
                &mut reasons_by_criterion,
                &mut failure_reasons,
            );
        }
    }

    if let Some(verification) = evidence.iter().find(|record| {
        Path::new(&record.output_name).file_name().map(|name| name == "verification.log").unwrap_or(false)
    }) {
        if verification.exists {
            let text = std::fs::read_to_string(&verification.path)?;
            if !COMMAND_MARKERS.iter().any(|marker| text.contains(marker)) {
                let targets = match_criteria(
                    &criterion_ids,
                    &["command evidence", "verification.log"],
                    &["verification", "command"],
                );
                attach(
                    &targets,
                    FailureReason {
                        code: ReasonCode::MissingCommandEvidence,
                        message: "verification.log must include command evidence markers \
                                  ('Command:' or 'COMMAND ENTRY')"
                            .to_string(),
                        details: json!({"path": verification.path}),
                    },
                    &mut reasons_by_criterion,
                    &mut failure_reasons,
                );
            }
        }
    }

    evaluate_scope_audit(
        input.changed_files,
        input.allowed_scope,
        &criterion_ids,
        &mut reasons_by_criterion,
        &mut failure_reasons,
    );

    let criterion_results: Vec<CriterionResult> = criterion_ids
        .iter()
        .zip(reasons_by_criterion.iter())
        .map(|((criterion_id, criterion), reason_codes)| CriterionResult {
            criterion_id: criterion_id.clone(),
            criterion: criterion.clone(),
            passed: reason_codes.is_empty(),
            reason_codes: reason_codes.clone(),
        })
        .collect();

    let status =
        if failure_reasons.is_empty() { AcceptanceStatus::Passed } else { AcceptanceStatus::Failed };

    let proof_payload = json!({
        "task_id": task_id,
        "run_id": run_id,
        "step_id": step_id,
        "status": status,
        "criteria": criterion_results,
        "evidence": evidence,
        "failure_reasons": failure_reasons,
    });
    let proof = AcceptanceProof {
        proof_id: stable_proof_id(&proof_payload),
        status,
        task_id,
        run_id,
        step_id: step_id.clone(),
        criteria: criterion_results.clone(),
        evidence,
    };

    let rework = if status == AcceptanceStatus::Failed {
        Some(ReworkPayload {
            next_action: "rework".to_string(),
            step_id,
            failed_criteria: criterion_results
                .iter()
                .filter(|result| !result.passed)
                .map(|result| ReworkCriterion {
                    criterion_id: result.criterion_id.clone(),
                    criterion: result.criterion.clone(),
                    reason_codes: result.reason_codes.clone(),
                })
                .collect(),
            directives: build_rework_directives(&failure_reasons),
        })
    } else {
        None
    };

    Ok(AcceptanceDecision { status, proof, failure_reasons, rework })
}

fn resolve_evidence(
    outputs: &[String],
    root: &Path,
) -> Result<(Vec<EvidenceRecord>, Vec<serde_json::Value>), AcceptanceError> {
    let mut records = Vec::with_capacity(outputs.len());
    let mut invalid = Vec::new();

    for output_name in outputs {
        let target = Path::new(output_name);
        let resolved = if target.is_absolute() {
            clean_path(target)
        } else {
            clean_path(&root.join(target))
        };
        let within_root = resolved.starts_with(root);
        let exists = within_root && resolved.is_file();
        if !within_root {
            invalid.push(json!({
                "output_name": output_name,
                "path": posix(&resolved),
                "evidence_root": posix(root),
            }));
        }

        let (sha256, size_bytes) = if exists {
            let content = std::fs::read(&resolved)?;
            (Some(sha256_hex(&content)), Some(content.len() as u64))
        } else {
            (None, None)
        };
        records.push(EvidenceRecord {
            output_name: output_name.clone(),
            path: posix(&resolved),
            exists,
            sha256,
            size_bytes,
        });
    }
    Ok((records, invalid))
}

/// Record a failure: push it onto the decision and tag each matched
/// criterion with the reason code once.
fn attach(
    targets: &[usize],
    reason: FailureReason,
    reasons_by_criterion: &mut [Vec<ReasonCode>],
    failure_reasons: &mut Vec<FailureReason>,
) {
    for index in targets {
        if !reasons_by_criterion[*index].contains(&reason.code) {
            reasons_by_criterion[*index].push(reason.code);
        }
    }
    failure_reasons.push(reason);
}

fn evaluate_scope_audit(
    changed_files: Option<&[String]>,
    allowed_scope: Option<&[String]>,
    criterion_ids: &[(String, String)],
    reasons_by_criterion: &mut [Vec<ReasonCode>],
    failure_reasons: &mut Vec<FailureReason>,
) {
    if changed_files.is_none() && allowed_scope.is_none() {
        return;
    }

    let targets = match_criteria(
        criterion_ids,
        &["out-of-scope", "scope", "unrelated"],
        &["change", "file"],
    );

    let (Some(changed), Some(scope)) = (changed_files, allowed_scope) else {
        attach(
            &targets,
            FailureReason {
                code: ReasonCode::ScopeAuditInputIncomplete,
                message: "scope audit requires both changed_files and allowed_scope to be \
                          present together"
                    .to_string(),
                details: json!({}),
            },
            reasons_by_criterion,
            failure_reasons,
        );
        return;
    };

    let audit = match audit_changed_files(changed, scope) {
        Ok(audit) => audit,
        Err(error) => {
            attach(
                &targets,
                FailureReason {
                    code: ReasonCode::ScopeAuditInputInvalid,
                    message: error.to_string(),
                    details: json!({}),
                },
                reasons_by_criterion,
                failure_reasons,
            );
            return;
        }
    };

    if audit.passed() {
        return;
    }
    attach(
        &targets,
        FailureReason {
            code: ReasonCode::OutOfScopeChange,
            message: "changed files violate allowed scope policy".to_string(),
            details: json!({
                "allowed_scope": audit.allowed_scope,
                "violating_files": audit.violating_files,
            }),
        },
        reasons_by_criterion,
        failure_reasons,
    );
}

/// Attach failures to criteria by textual affinity: preferred phrases
/// first, then fallbacks, finally every criterion.
fn match_criteria(
    criterion_ids: &[(String, String)],
    preferred: &[&str],
    fallback: &[&str],
) -> Vec<usize> {
    let lowered: Vec<String> =
        criterion_ids.iter().map(|(_, criterion)| criterion.to_lowercase()).collect();

    let matches = |phrases: &[&str]| -> Vec<usize> {
        lowered
            .iter()
            .enumerate()
            .filter(|(_, text)| phrases.iter().any(|phrase| text.contains(phrase)))
            .map(|(index, _)| index)
            .collect()
    };

    let preferred_matches = matches(preferred);
    if !preferred_matches.is_empty() {
        return preferred_matches;
    }
    let fallback_matches = matches(fallback);
    if !fallback_matches.is_empty() {
        return fallback_matches;
    }
    (0..criterion_ids.len()).collect()
}

fn build_rework_directives(failure_reasons: &[FailureReason]) -> Vec<String> {
    let mut directives = Vec::new();
    for reason in failure_reasons {
        let directive = match reason.code {
            ReasonCode::MissingEvidence => {
                let missing =
                    reason.details["missing_output"].as_str().unwrap_or("<unknown>").to_string();
                format!("create missing evidence artifact: {missing}")
            }
            ReasonCode::MissingCommandEvidence => {
                "add command evidence markers to verification.log: include 'Command: <cmd>' \
                 and/or '=== COMMAND ENTRY N START/END ==='"
                    .to_string()
            }
            ReasonCode::OutOfScopeChange => {
                let violating = reason.details["violating_files"]
                    .as_array()
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|item| item.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .filter(|rendered| !rendered.is_empty())
                    .unwrap_or_else(|| "<unknown>".to_string());
                format!("remove out-of-scope edits and keep only allowed files: {violating}")
            }
            ReasonCode::ScopeAuditInputIncomplete | ReasonCode::ScopeAuditInputInvalid => {
                "provide valid scope audit inputs: changed_files and allowed_scope".to_string()
            }
            _ => "resolve acceptance failure and rerun verification".to_string(),
        };
        if !directives.contains(&directive) {
            directives.push(directive);
        }
    }
    directives
}

fn expect_non_empty(value: &str, name: &str) -> Result<String, AcceptanceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AcceptanceError::EmptyField { name: name.to_string() });
    }
    Ok(trimmed.to_string())
}

fn expect_string_list(values: &[String], name: &str) -> Result<Vec<String>, AcceptanceError> {
    let mut out: Vec<String> = Vec::new();
    for (index, value) in values.iter().enumerate() {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AcceptanceError::EmptyField { name: format!("{name}[{index}]") });
        }
        if !out.iter().any(|existing| existing == trimmed) {
            out.push(trimmed.to_string());
        }
    }
    if out.is_empty() {
        return Err(AcceptanceError::EmptyList { name: name.to_string() });
    }
    Ok(out)
}

/// Lexically normalize a path: drop `.`, fold `..` into its parent.
fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn posix(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
