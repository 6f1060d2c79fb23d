// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch call artifact persistence.

use crate::{DispatchAction, DispatchError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Paths of the JSON artifacts persisted for one adapter call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DispatchArtifacts {
    pub request_path: Option<PathBuf>,
    pub response_path: Option<PathBuf>,
    pub error_path: Option<PathBuf>,
}

impl DispatchArtifacts {
    /// Forward-slash rendering of every present path, in request /
    /// response / error order, for event payloads.
    pub fn normalized_paths(&self) -> Vec<String> {
        [&self.request_path, &self.response_path, &self.error_path]
            .into_iter()
            .flatten()
            .map(|path| path.to_string_lossy().replace('\\', "/"))
            .collect()
    }
}

/// Writes per-call request/response/error JSON files under
/// `<root>/dispatch/<task>/<run>/<step>/`.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn call_dir(&self, task_id: &str, run_id: &str, step_id: &str) -> PathBuf {
        self.root.join("dispatch").join(task_id).join(run_id).join(step_id)
    }

    fn write_json(&self, path: &Path, value: &Value) -> Result<(), DispatchError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut body = serde_json::to_vec_pretty(value)?;
        body.push(b'\n');
        fs::write(path, body)?;
        Ok(())
    }

    /// Persist the request and either a response or an error payload for
    /// one call, returning the artifact paths.
    pub fn persist_call(
        &self,
        action: DispatchAction,
        task_id: &str,
        run_id: &str,
        step_id: &str,
        retry_index: u32,
        request: &Value,
        response: Result<&Value, &Value>,
    ) -> Result<DispatchArtifacts, DispatchError> {
        let dir = self.call_dir(task_id, run_id, step_id);
        let stem = format!("{action}-{retry_index:03}");

        let request_path = dir.join(format!("{stem}-request.json"));
        self.write_json(&request_path, request)?;

        let mut artifacts = DispatchArtifacts {
            request_path: Some(request_path),
            response_path: None,
            error_path: None,
        };
        match response {
            Ok(body) => {
                let path = dir.join(format!("{stem}-response.json"));
                self.write_json(&path, body)?;
                artifacts.response_path = Some(path);
            }
            Err(body) => {
                let path = dir.join(format!("{stem}-error.json"));
                self.write_json(&path, body)?;
                artifacts.error_path = Some(path);
            }
        }
        Ok(artifacts)
    }
}

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
