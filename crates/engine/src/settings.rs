// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime settings resolution.
//!
//! The core never reads environment variables directly; operators feed an
//! env map and the optional `state/runtime_settings.json` through this
//! module and everything downstream consumes the typed struct.

use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

pub const ENV_DISPATCH_BACKEND: &str = "DAOKIT_DISPATCH_BACKEND";
pub const ENV_RUNTIME_ENGINE: &str = "DAOKIT_RUNTIME_ENGINE";
pub const ENV_CODEX_TIMEOUT_SECONDS: &str = "DAOKIT_CODEX_TIMEOUT_SECONDS";

/// Settings resolution failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("unsupported dispatch backend '{value}'. Supported values: shim, llm.")]
    UnknownDispatchBackend { value: String },

    #[error("unsupported runtime engine '{value}'. Supported values: legacy, integrated.")]
    UnknownRuntimeEngine { value: String },

    #[error("{name} must be a positive number of seconds, got '{value}'")]
    InvalidTimeout { name: &'static str, value: String },
}

/// Which executor family the dispatch node plugs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchBackend {
    #[default]
    Shim,
    Llm,
}

/// Which runtime drives the node graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeEngine {
    #[default]
    Legacy,
    Integrated,
}

/// The `runtime_settings.json` shape: nested sections, all optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeSettingsFile {
    #[serde(default)]
    pub dispatch: DispatchSection,
    #[serde(default)]
    pub runtime: RuntimeSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DispatchSection {
    #[serde(default)]
    pub backend: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeSection {
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub dispatch_backend: Option<String>,
}

/// Resolved runtime tuning consumed by the core.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuntimeSettings {
    pub dispatch_backend: DispatchBackend,
    pub runtime_engine: RuntimeEngine,
    pub codex_timeout_seconds: Option<u64>,
}

impl RuntimeSettings {
    /// Resolve from the environment map and the optional settings file.
    /// Precedence: env var, then file, then default.
    pub fn resolve(
        env: &HashMap<String, String>,
        file: Option<&RuntimeSettingsFile>,
    ) -> Result<Self, SettingsError> {
        let backend_source = env
            .get(ENV_DISPATCH_BACKEND)
            .cloned()
            .or_else(|| file.and_then(|f| f.dispatch.backend.clone()))
            .or_else(|| file.and_then(|f| f.runtime.dispatch_backend.clone()));
        let dispatch_backend = parse_dispatch_backend(backend_source.as_deref())?;

        let engine_source = env
            .get(ENV_RUNTIME_ENGINE)
            .cloned()
            .or_else(|| file.and_then(|f| f.runtime.engine.clone()));
        let runtime_engine = parse_runtime_engine(engine_source.as_deref())?;

        let codex_timeout_seconds = match env.get(ENV_CODEX_TIMEOUT_SECONDS) {
            None => None,
            Some(raw) => {
                let parsed = raw.trim().parse::<u64>().ok().filter(|seconds| *seconds > 0);
                Some(parsed.ok_or_else(|| SettingsError::InvalidTimeout {
                    name: ENV_CODEX_TIMEOUT_SECONDS,
                    value: raw.clone(),
                })?)
            }
        };

        Ok(Self { dispatch_backend, runtime_engine, codex_timeout_seconds })
    }
}

fn parse_dispatch_backend(source: Option<&str>) -> Result<DispatchBackend, SettingsError> {
    match source.map(|value| value.trim().to_lowercase()) {
        None => Ok(DispatchBackend::Shim),
        Some(value) if value == "shim" => Ok(DispatchBackend::Shim),
        Some(value) if value == "llm" => Ok(DispatchBackend::Llm),
        Some(value) => Err(SettingsError::UnknownDispatchBackend { value }),
    }
}

fn parse_runtime_engine(source: Option<&str>) -> Result<RuntimeEngine, SettingsError> {
    match source.map(|value| value.trim().to_lowercase()) {
        None => Ok(RuntimeEngine::Legacy),
        Some(value) if value == "legacy" => Ok(RuntimeEngine::Legacy),
        Some(value) if value == "integrated" => Ok(RuntimeEngine::Integrated),
        Some(value) => Err(SettingsError::UnknownRuntimeEngine { value }),
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
