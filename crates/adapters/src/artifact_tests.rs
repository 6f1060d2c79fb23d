// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use tempfile::tempdir;

#[test]
fn persist_call_writes_request_and_response() {
    let dir = tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());

    let artifacts = store
        .persist_call(
            DispatchAction::Create,
            "T",
            "R",
            "S1",
            0,
            &json!({"goal": "x"}),
            Ok(&json!({"status": "success"})),
        )
        .unwrap();

    let request_path = artifacts.request_path.clone().unwrap();
    assert!(request_path.ends_with("dispatch/T/R/S1/create-000-request.json"));
    assert!(request_path.is_file());
    assert!(artifacts.response_path.clone().unwrap().is_file());
    assert!(artifacts.error_path.is_none());
}

#[test]
fn persist_call_writes_error_artifact_on_failure() {
    let dir = tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());

    let artifacts = store
        .persist_call(
            DispatchAction::Resume,
            "T",
            "R",
            "S1",
            2,
            &json!({}),
            Err(&json!({"error": "shim exited 1"})),
        )
        .unwrap();

    let error_path = artifacts.error_path.clone().unwrap();
    assert!(error_path.ends_with("dispatch/T/R/S1/resume-002-error.json"));
    assert!(artifacts.response_path.is_none());

    let body: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&error_path).unwrap()).unwrap();
    assert_eq!(body["error"], json!("shim exited 1"));
}

#[test]
fn normalized_paths_render_forward_slashes_in_order() {
    let artifacts = DispatchArtifacts {
        request_path: Some("a/b-request.json".into()),
        response_path: None,
        error_path: Some("a/b-error.json".into()),
    };
    assert_eq!(
        artifacts.normalized_paths(),
        vec!["a/b-request.json".to_string(), "a/b-error.json".to_string()]
    );
}
