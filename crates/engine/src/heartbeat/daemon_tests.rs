// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Duration;
use daokit_core::FakeClock;
use daokit_storage::FsStateStore;
use tempfile::{tempdir, TempDir};

fn daemon(dir: &TempDir) -> (HeartbeatDaemon<FsStateStore<FakeClock>, FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    let store = Arc::new(FsStateStore::open(dir.path().join("state"), clock.clone()).unwrap());
    let thresholds = HeartbeatThresholds::new(60, 900, 1200).unwrap();
    let daemon = HeartbeatDaemon::new(
        "DKT-HB",
        "HB-1",
        "S1",
        store,
        dir.path().join("artifacts"),
        thresholds,
        clock.clone(),
    );
    (daemon, clock)
}

#[test]
fn explicit_heartbeat_persists_running() {
    let dir = tempdir().unwrap();
    let (daemon, clock) = daemon(&dir);

    let status = daemon.record_explicit_heartbeat(None).unwrap();
    assert_eq!(status.status, HeartbeatState::Running);
    assert_eq!(status.last_heartbeat_at, Some(clock.now_utc()));
    assert_eq!(status.warning_after_seconds, Some(900));
    assert_eq!(status.stale_after_seconds, Some(1200));
}

#[test]
fn stale_tick_emits_exactly_one_event() {
    let dir = tempdir().unwrap();
    let (daemon, clock) = daemon(&dir);

    // Beat at T0 - 2h05m, then evaluate at T0.
    let beat_at = clock.now_utc();
    daemon.record_explicit_heartbeat(Some(beat_at)).unwrap();
    clock.advance(Duration::hours(2) + Duration::minutes(5));

    let first = daemon.tick().unwrap();
    assert_eq!(first.state, HeartbeatState::Stale);
    assert_eq!(first.reason_code.as_deref(), Some("NO_OUTPUT_20M"));
    assert!(first.stale_event_emitted);

    // Five minutes later, still stale with the same signal: no new event.
    clock.advance(Duration::minutes(5));
    let second = daemon.tick().unwrap();
    assert_eq!(second.state, HeartbeatState::Stale);
    assert!(!second.stale_event_emitted);

    let store = FsStateStore::open(dir.path().join("state"), clock.clone()).unwrap();
    let stale_events: Vec<_> = daokit_storage::StateBackend::list_events(&store)
        .unwrap()
        .into_iter()
        .filter(|event| event.event_type == EventType::HeartbeatStale)
        .collect();
    assert_eq!(stale_events.len(), 1);
    assert_eq!(stale_events[0].step_id.as_deref(), Some("S1"));
    assert!(stale_events[0]
        .dedup_key
        .as_deref()
        .unwrap()
        .starts_with("heartbeat-stale:DKT-HB:HB-1:S1:NO_OUTPUT_20M:"));
}

#[test]
fn fresh_beat_keeps_the_run_running() {
    let dir = tempdir().unwrap();
    let (daemon, clock) = daemon(&dir);

    daemon.record_explicit_heartbeat(None).unwrap();
    clock.advance(Duration::seconds(30));
    let tick = daemon.tick().unwrap();
    assert_eq!(tick.state, HeartbeatState::Running);
    assert!(!tick.stale_event_emitted);
    assert!(tick.reason_code.is_none());
}

#[test]
fn artifact_mtime_counts_as_an_implicit_signal() {
    let dir = tempdir().unwrap();
    let (daemon, clock) = daemon(&dir);

    // Stale-old explicit beat, but a fresh artifact write.
    daemon.record_explicit_heartbeat(Some(clock.now_utc() - Duration::hours(5))).unwrap();
    let artifact_dir = dir.path().join("artifacts").join("logs");
    std::fs::create_dir_all(&artifact_dir).unwrap();
    std::fs::write(artifact_dir.join("out.txt"), b"progress").unwrap();

    // The artifact mtime is wall-clock "now"; move the fake clock close to
    // it so the implicit signal reads as fresh.
    clock.set(Utc::now());
    let tick = daemon.tick().unwrap();
    assert_eq!(tick.state, HeartbeatState::Running);
}

#[test]
fn recovering_signal_rearms_the_stale_edge() {
    let dir = tempdir().unwrap();
    let (daemon, clock) = daemon(&dir);

    daemon.record_explicit_heartbeat(None).unwrap();
    clock.advance(Duration::seconds(2000));
    assert!(daemon.tick().unwrap().stale_event_emitted);

    // A new beat recovers the run, then a second silence goes stale again
    // with a new signal: a second event is emitted.
    daemon.record_explicit_heartbeat(None).unwrap();
    clock.advance(Duration::seconds(2000));
    assert!(daemon.tick().unwrap().stale_event_emitted);
}

#[test]
fn latest_artifact_mtime_handles_missing_root() {
    let dir = tempdir().unwrap();
    assert!(latest_artifact_mtime(&dir.path().join("nope")).is_none());
}
