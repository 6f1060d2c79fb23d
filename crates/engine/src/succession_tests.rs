// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::lease::RegisterLease;
use chrono::Duration;
use daokit_core::{FakeClock, LeaseStatus};
use daokit_storage::FsStateStore;
use tempfile::{tempdir, TempDir};

fn setup(dir: &TempDir) -> (SuccessionManager<FsStateStore<FakeClock>, FakeClock>, Arc<FsStateStore<FakeClock>>, FakeClock) {
    let clock = FakeClock::new();
    let store = Arc::new(FsStateStore::open(dir.path().join("state"), clock.clone()).unwrap());
    let manager = SuccessionManager::new("DKT-S", "S-1", store.clone(), clock.clone());
    (manager, store, clock)
}

fn register(store: &Arc<FsStateStore<FakeClock>>, clock: &FakeClock, step: &str, ttl: u64) {
    let registry = LeaseRegistry::new(store.clone(), clock.clone());
    registry
        .register(RegisterLease {
            lane: "controller".to_string(),
            step_id: step.to_string(),
            task_id: "DKT-S".to_string(),
            run_id: "S-1".to_string(),
            thread_id: "thr1".to_string(),
            pid: 1001,
            ttl_seconds: ttl,
        })
        .unwrap();
}

#[test]
fn takeover_classifies_adopted_and_failed_steps() {
    let dir = tempdir().unwrap();
    let (manager, store, clock) = setup(&dir);

    // Lease A stays valid for 5 more minutes; lease B expired 1 minute ago.
    register(&store, &clock, "S1", 360);
    register(&store, &clock, "S2", 59);
    clock.advance(Duration::seconds(60));

    let result = manager.accept_successor("thr2", 2002, None).unwrap();
    assert_eq!(result.adopted_step_ids, vec!["S1".to_string()]);
    assert_eq!(result.failed_step_ids, vec!["S2".to_string()]);

    let leases = store.load_leases().unwrap().leases;
    let adopted = leases.iter().find(|lease| lease.step_id == "S1").unwrap();
    assert_eq!(adopted.thread_id, "thr2");
    assert_eq!(adopted.pid, 2002);
    assert_eq!(adopted.status, LeaseStatus::Active);
    let failed = leases.iter().find(|lease| lease.step_id == "S2").unwrap();
    assert_eq!(failed.status, LeaseStatus::Expired);

    let state = store.load_state().unwrap();
    assert_eq!(state.succession.last_takeover_at, Some(result.takeover_at));
    assert_eq!(state.role_lifecycle.step("S2"), Some("failed_non_adopted_lease"));

    let events = store.list_events().unwrap();
    let types: Vec<_> = events.iter().map(|event| event.event_type).collect();
    assert!(types.contains(&EventType::SuccessionAccepted));
    assert!(types.contains(&EventType::LeaseAdopted));
    assert!(types.contains(&EventType::StepFailed));

    let accepted = events
        .iter()
        .find(|event| event.event_type == EventType::SuccessionAccepted)
        .unwrap();
    assert_eq!(accepted.payload["adopted_step_ids"], serde_json::json!(["S1"]));
    assert_eq!(accepted.payload["failed_step_ids"], serde_json::json!(["S2"]));

    let adopted_event =
        events.iter().find(|event| event.event_type == EventType::LeaseAdopted).unwrap();
    assert_eq!(adopted_event.payload["reason_code"], serde_json::json!("VALID_UNEXPIRED_LEASE"));
    let failed_event =
        events.iter().find(|event| event.event_type == EventType::StepFailed).unwrap();
    assert_eq!(failed_event.payload["reason_code"], serde_json::json!("LEASE_NOT_ADOPTED"));
}

#[test]
fn takeover_backfills_blank_ledger_ids() {
    let dir = tempdir().unwrap();
    let (manager, store, clock) = setup(&dir);
    register(&store, &clock, "S1", 600);

    manager.accept_successor("thr2", 2002, None).unwrap();
    let state = store.load_state().unwrap();
    assert_eq!(state.task_id.as_deref(), Some("DKT-S"));
    assert_eq!(state.run_id.as_deref(), Some("S-1"));
}

#[test]
fn takeover_with_no_adoptions_leaves_last_takeover_unset() {
    let dir = tempdir().unwrap();
    let (manager, store, clock) = setup(&dir);
    register(&store, &clock, "S1", 30);
    clock.advance(Duration::seconds(31));

    let result = manager.accept_successor("thr2", 2002, None).unwrap();
    assert!(result.adopted_step_ids.is_empty());
    assert_eq!(result.failed_step_ids, vec!["S1".to_string()]);
    assert!(store.load_state().unwrap().succession.last_takeover_at.is_none());
}

#[test]
fn repeat_takeover_at_same_instant_dedups_events() {
    let dir = tempdir().unwrap();
    let (manager, store, clock) = setup(&dir);
    register(&store, &clock, "S1", 600);

    manager.accept_successor("thr2", 2002, None).unwrap();
    // Same clock instant: identical dedup keys, so no duplicate records.
    manager.accept_successor("thr3", 3003, None).unwrap();

    let events = store.list_events().unwrap();
    let accepted: Vec<_> = events
        .iter()
        .filter(|event| event.event_type == EventType::SuccessionAccepted)
        .collect();
    assert_eq!(accepted.len(), 1);
}
