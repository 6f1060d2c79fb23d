// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Random identifier minting for events and lease tokens.
//!
//! Task and run ids are content-derived (see the planner); only event ids
//! and lease tokens are random, and both carry a type prefix so a raw id in
//! a log line is self-describing.

use uuid::Uuid;

/// Mint an event id: `evt_<32 hex chars>`.
pub fn new_event_id() -> String {
    format!("evt_{}", Uuid::new_v4().simple())
}

/// Mint a lease token: `lease_<32 hex chars>`.
///
/// Tokens are globally unique per issuance; a takeover mints a fresh one.
pub fn new_lease_token() -> String {
    format!("lease_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
