// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn defaults_are_shim_and_legacy() {
    let settings = RuntimeSettings::resolve(&HashMap::new(), None).unwrap();
    assert_eq!(settings.dispatch_backend, DispatchBackend::Shim);
    assert_eq!(settings.runtime_engine, RuntimeEngine::Legacy);
    assert!(settings.codex_timeout_seconds.is_none());
}

#[test]
fn env_overrides_file() {
    let file: RuntimeSettingsFile =
        serde_json::from_str(r#"{"dispatch": {"backend": "llm"}}"#).unwrap();
    let settings =
        RuntimeSettings::resolve(&env(&[(ENV_DISPATCH_BACKEND, "shim")]), Some(&file)).unwrap();
    assert_eq!(settings.dispatch_backend, DispatchBackend::Shim);
}

#[test]
fn file_sections_fill_in_when_env_is_absent() {
    let file: RuntimeSettingsFile = serde_json::from_str(
        r#"{"dispatch": {"backend": "llm"}, "runtime": {"engine": "integrated"}}"#,
    )
    .unwrap();
    let settings = RuntimeSettings::resolve(&HashMap::new(), Some(&file)).unwrap();
    assert_eq!(settings.dispatch_backend, DispatchBackend::Llm);
    assert_eq!(settings.runtime_engine, RuntimeEngine::Integrated);
}

#[test]
fn runtime_dispatch_backend_is_a_fallback_path() {
    let file: RuntimeSettingsFile =
        serde_json::from_str(r#"{"runtime": {"dispatch_backend": "llm"}}"#).unwrap();
    let settings = RuntimeSettings::resolve(&HashMap::new(), Some(&file)).unwrap();
    assert_eq!(settings.dispatch_backend, DispatchBackend::Llm);
}

#[parameterized(
    mixed_case = { "LLM", DispatchBackend::Llm },
    padded = { " shim ", DispatchBackend::Shim },
)]
fn backend_values_are_normalized(raw: &str, expected: DispatchBackend) {
    let settings =
        RuntimeSettings::resolve(&env(&[(ENV_DISPATCH_BACKEND, raw)]), None).unwrap();
    assert_eq!(settings.dispatch_backend, expected);
}

#[test]
fn unknown_values_are_typed_errors() {
    assert!(matches!(
        RuntimeSettings::resolve(&env(&[(ENV_DISPATCH_BACKEND, "carrier-pigeon")]), None),
        Err(SettingsError::UnknownDispatchBackend { .. })
    ));
    assert!(matches!(
        RuntimeSettings::resolve(&env(&[(ENV_RUNTIME_ENGINE, "quantum")]), None),
        Err(SettingsError::UnknownRuntimeEngine { .. })
    ));
}

#[test]
fn codex_timeout_parses_positive_seconds() {
    let settings =
        RuntimeSettings::resolve(&env(&[(ENV_CODEX_TIMEOUT_SECONDS, "90")]), None).unwrap();
    assert_eq!(settings.codex_timeout_seconds, Some(90));

    for bad in ["0", "-5", "soon"] {
        assert!(matches!(
            RuntimeSettings::resolve(&env(&[(ENV_CODEX_TIMEOUT_SECONDS, bad)]), None),
            Err(SettingsError::InvalidTimeout { .. })
        ));
    }
}
