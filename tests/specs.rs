// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level operator specs: drive the built `daokit` binary through
//! the documented command surface and exit codes.

use assert_cmd::Command;
use serial_test::serial;
use std::path::Path;
use tempfile::tempdir;

fn cmd() -> Command {
    Command::cargo_bin("daokit").expect("binary builds")
}

fn stdout_of(assert: assert_cmd::assert::Assert) -> String {
    String::from_utf8(assert.get_output().stdout.clone()).expect("utf-8 stdout")
}

fn read_json(path: &Path) -> serde_json::Value {
    let body = std::fs::read_to_string(path).expect("file readable");
    serde_json::from_str(&body).expect("valid JSON")
}

fn write_json(path: &Path, value: &serde_json::Value) {
    let body = serde_json::to_string_pretty(value).expect("serializable");
    std::fs::write(path, body + "\n").expect("file writable");
}

#[test]
#[serial]
fn init_lays_out_state_and_is_idempotent() {
    let dir = tempdir().unwrap();
    let root = dir.path();

    let out = stdout_of(cmd().args(["init", "--root"]).arg(root).assert().success());
    assert!(out.contains("Created:"), "unexpected init output: {out}");

    for file in [
        "state/pipeline_state.json",
        "state/heartbeat_status.json",
        "state/process_leases.json",
        "state/events.jsonl",
        "state/snapshots.jsonl",
    ] {
        assert!(root.join(file).is_file(), "missing {file}");
    }
    assert!(root.join("artifacts").is_dir());

    let out = stdout_of(cmd().args(["init", "--root"]).arg(root).assert().success());
    assert!(out.contains("Unchanged:"), "second init should skip: {out}");
}

#[test]
#[serial]
fn init_conflict_exits_one() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    std::fs::write(root.join("state"), b"not a directory").unwrap();

    cmd().args(["init", "--root"]).arg(root).assert().code(1);
}

#[test]
#[serial]
fn run_drives_the_pipeline_to_done() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    cmd().args(["init", "--root"]).arg(root).assert().success();

    let out = stdout_of(
        cmd()
            .args(["run", "--task-id", "DKT-HP", "--run-id", "HP-1", "--goal", "x", "--root"])
            .arg(root)
            .assert()
            .success(),
    );
    assert!(out.contains("status=DONE"), "unexpected run output: {out}");

    let state = read_json(&root.join("state/pipeline_state.json"));
    assert_eq!(state["status"], "DONE");
    assert_eq!(state["task_id"], "DKT-HP");

    // The snapshot log interleaves the bootstrap save and lease lifecycle
    // syncs with the five node transitions, in graph order.
    let snapshots = std::fs::read_to_string(root.join("state/snapshots.jsonl")).unwrap();
    let nodes: Vec<String> = snapshots
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
        .filter_map(|snapshot| snapshot["node"].as_str().map(str::to_string))
        .collect();
    assert_eq!(nodes.first().map(String::as_str), Some("bootstrap"));
    let transitions: Vec<&str> = nodes
        .iter()
        .map(String::as_str)
        .filter(|node| !matches!(*node, "bootstrap" | "lease_lifecycle_sync"))
        .collect();
    assert_eq!(transitions, vec!["extract", "plan", "dispatch", "verify", "transition"]);

    let out = stdout_of(cmd().args(["status", "--root"]).arg(root).assert().success());
    assert!(out.contains("status=DONE"), "unexpected status output: {out}");

    let out = stdout_of(
        cmd().args(["replay", "--source", "events", "--root"]).arg(root).assert().success(),
    );
    assert!(out.contains("SYSTEM"), "unexpected replay output: {out}");
}

#[test]
#[serial]
fn run_with_a_compiled_plan_uses_the_operator_steps() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    cmd().args(["init", "--root"]).arg(root).assert().success();

    let plan = serde_json::json!({
        "goal": "ship the widget",
        "steps": [
            {
                "id": "W1",
                "title": "Design the widget",
                "category": "analysis",
                "goal": "decide the widget shape",
                "actions": ["sketch it"],
                "acceptance_criteria": ["shape agreed"],
                "expected_outputs": ["design/widget.md"],
                "dependencies": []
            },
            {
                "id": "W2",
                "title": "Build the widget",
                "category": "implementation",
                "goal": "build it",
                "actions": ["cut and glue"],
                "acceptance_criteria": ["widget assembled"],
                "expected_outputs": ["build/widget.stl"],
                "dependencies": ["W1"]
            }
        ]
    });
    let plan_path = root.join("plan.json");
    write_json(&plan_path, &plan);

    cmd()
        .args(["run", "--task-id", "DKT-PLAN", "--run-id", "PLAN-1", "--goal", "ship the widget"])
        .args(["--step-id", "W1", "--plan", "plan.json", "--root"])
        .arg(root)
        .assert()
        .success();

    let state = read_json(&root.join("state/pipeline_state.json"));
    assert_eq!(state["status"], "DONE");
    let ids: Vec<&str> = state["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|step| step["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["W1", "W2"]);
}

#[test]
#[serial]
fn run_rejects_a_cyclic_plan() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    cmd().args(["init", "--root"]).arg(root).assert().success();

    let plan = serde_json::json!({
        "goal": "impossible",
        "steps": [
            {
                "id": "C1", "title": "t", "category": "implementation", "goal": "g",
                "actions": ["a"], "acceptance_criteria": ["c"],
                "expected_outputs": ["c1.md"], "dependencies": ["C2"]
            },
            {
                "id": "C2", "title": "t", "category": "implementation", "goal": "g",
                "actions": ["a"], "acceptance_criteria": ["c"],
                "expected_outputs": ["c2.md"], "dependencies": ["C1"]
            }
        ]
    });
    write_json(&root.join("plan.json"), &plan);

    let assert = cmd()
        .args(["run", "--task-id", "DKT-CYC", "--goal", "x", "--plan", "plan.json", "--root"])
        .arg(root)
        .assert()
        .code(1);
    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("dependency cycle detected"), "unexpected stderr: {stderr}");
}

#[test]
#[serial]
fn simulated_interruption_exits_130_and_leaves_the_lease_active() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    cmd().args(["init", "--root"]).arg(root).assert().success();

    cmd()
        .args([
            "run",
            "--task-id",
            "DKT-INT",
            "--run-id",
            "INT-1",
            "--goal",
            "x",
            "--simulate-interruption",
            "--root",
        ])
        .arg(root)
        .assert()
        .code(130);

    let leases = read_json(&root.join("state/process_leases.json"));
    let records = leases["leases"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], "ACTIVE");
    assert_eq!(records[0]["task_id"], "DKT-INT");

    // A successor adopts the abandoned lease, rotating the token.
    let old_token = records[0]["lease_token"].as_str().unwrap().to_string();
    let out = stdout_of(
        cmd()
            .args([
                "takeover",
                "--task-id",
                "DKT-INT",
                "--run-id",
                "INT-1",
                "--successor-thread-id",
                "thr2",
                "--root",
            ])
            .arg(root)
            .assert()
            .success(),
    );
    let summary: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(summary["adopted_step_ids"], serde_json::json!(["S1"]));
    assert_eq!(summary["failed_step_ids"], serde_json::json!([]));

    let leases = read_json(&root.join("state/process_leases.json"));
    assert_eq!(leases["leases"][0]["thread_id"], "thr2");
    assert_ne!(leases["leases"][0]["lease_token"], serde_json::json!(old_token));
}

#[test]
#[serial]
fn check_reports_stale_with_exit_two() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    cmd().args(["init", "--root"]).arg(root).assert().success();

    // Fresh root: PLANNING is not an active status, so the check passes.
    cmd().args(["check", "--root"]).arg(root).assert().code(0);

    // An active run with no heartbeat and no artifacts is stale.
    let state_path = root.join("state/pipeline_state.json");
    let mut state = read_json(&state_path);
    state["status"] = serde_json::json!("EXECUTE");
    write_json(&state_path, &state);

    let assert = cmd().args(["check", "--root"]).arg(root).assert().code(2);
    let out = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(out.contains("heartbeat=STALE"), "unexpected check output: {out}");
}

#[test]
#[serial]
fn handoff_create_then_apply_round_trips() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    cmd().args(["init", "--root"]).arg(root).assert().success();
    cmd()
        .args(["run", "--task-id", "DKT-HO", "--run-id", "HO-1", "--goal", "x", "--root"])
        .arg(root)
        .assert()
        .success();

    let out = stdout_of(
        cmd()
            .args(["handoff", "--create", "--include-accepted-steps", "--root"])
            .arg(root)
            .assert()
            .success(),
    );
    let package: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(package["task_id"], "DKT-HO");
    assert_eq!(package["package_hash"].as_str().unwrap().len(), 64);
    assert!(root.join("state/handoff_package.json").is_file());

    let out = stdout_of(
        cmd()
            .args(["handoff", "--apply", "--include-accepted-steps", "--root"])
            .arg(root)
            .assert()
            .success(),
    );
    let plan: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(plan["task_id"], "DKT-HO");
    assert_eq!(plan["run_id"], "HO-1");
    assert_eq!(plan["next_action"], "resume");

    let out = stdout_of(cmd().args(["status", "--root"]).arg(root).assert().success());
    assert!(out.contains("handoff=yes"), "unexpected status output: {out}");
}
