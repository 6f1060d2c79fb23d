// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical JSON serialization and content hashing.
//!
//! Package hashes, proof ids, and derived task/run ids all hash the same
//! canonical form: object keys sorted recursively, compact separators, no
//! insignificant whitespace. Two structurally equal values always produce
//! the same digest regardless of field order at the call site.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Render a JSON value in canonical form (sorted keys, compact).
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            // Scalars already have a single JSON rendering.
            out.push_str(&value.to_string());
        }
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (index, key) in keys.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                if let Some(item) = map.get(*key) {
                    write_canonical(item, out);
                }
            }
            out.push('}');
        }
    }
}

/// SHA-256 digest of raw bytes as lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Uppercase-hex SHA-256 over the canonical rendering of a JSON value.
///
/// Used for deterministic task/run id derivation.
pub fn stable_hash(value: &Value) -> String {
    sha256_hex(canonical_json(value).as_bytes()).to_uppercase()
}

#[cfg(test)]
#[path = "hash_tests.rs"]
mod tests;
