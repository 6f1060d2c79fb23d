// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

fn t0() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().unwrap()
}

fn thresholds() -> HeartbeatThresholds {
    HeartbeatThresholds::new(60, 900, 1200).unwrap()
}

#[test]
fn inactive_execution_is_idle() {
    let evaluation = evaluate_heartbeat(t0(), false, &thresholds(), None, None);
    assert_eq!(evaluation.phase, HeartbeatPhase::Idle);
    assert_eq!(evaluation.silence_seconds, 0);
    assert!(evaluation.reason_code.is_none());
}

#[test]
fn fresh_signal_is_active() {
    let signal = t0() - Duration::seconds(30);
    let evaluation = evaluate_heartbeat(t0(), true, &thresholds(), Some(signal), None);
    assert_eq!(evaluation.phase, HeartbeatPhase::Active);
    assert_eq!(evaluation.silence_seconds, 30);
    assert_eq!(evaluation.effective_signal_at, Some(signal));
}

#[test]
fn warning_threshold_reports_warning_reason() {
    let signal = t0() - Duration::seconds(1000);
    let evaluation = evaluate_heartbeat(t0(), true, &thresholds(), Some(signal), None);
    assert_eq!(evaluation.phase, HeartbeatPhase::Warning);
    assert_eq!(evaluation.reason_code.as_deref(), Some("NO_OUTPUT_15M"));
}

#[test]
fn stale_threshold_reports_stale_reason() {
    // Two hours and five minutes of silence, as in the stale scenario.
    let signal = t0() - Duration::hours(2) - Duration::minutes(5);
    let evaluation = evaluate_heartbeat(t0(), true, &thresholds(), Some(signal), None);
    assert_eq!(evaluation.phase, HeartbeatPhase::Stale);
    assert_eq!(evaluation.reason_code.as_deref(), Some("NO_OUTPUT_20M"));
    assert_eq!(evaluation.silence_seconds, 7500);
}

#[test]
fn effective_signal_is_the_latest_of_explicit_and_implicit() {
    let explicit = t0() - Duration::minutes(30);
    let implicit = t0() - Duration::minutes(2);
    let evaluation =
        evaluate_heartbeat(t0(), true, &thresholds(), Some(explicit), Some(implicit));
    assert_eq!(evaluation.phase, HeartbeatPhase::Active);
    assert_eq!(evaluation.effective_signal_at, Some(implicit));
}

#[test]
fn no_signal_at_all_is_immediately_stale() {
    let evaluation = evaluate_heartbeat(t0(), true, &thresholds(), None, None);
    assert_eq!(evaluation.phase, HeartbeatPhase::Stale);
    assert_eq!(evaluation.silence_seconds, 1200);
    assert!(evaluation.effective_signal_at.is_none());
}

#[test]
fn future_signal_clamps_silence_to_zero() {
    let signal = t0() + Duration::minutes(3);
    let evaluation = evaluate_heartbeat(t0(), true, &thresholds(), Some(signal), None);
    assert_eq!(evaluation.phase, HeartbeatPhase::Active);
    assert_eq!(evaluation.silence_seconds, 0);
}

#[test]
fn threshold_ordering_is_enforced() {
    assert!(matches!(
        HeartbeatThresholds::new(300, 200, 1200),
        Err(HeartbeatError::WarningBelowCheckInterval)
    ));
    assert!(matches!(
        HeartbeatThresholds::new(60, 900, 800),
        Err(HeartbeatError::StaleBelowWarning)
    ));
    assert!(matches!(
        HeartbeatThresholds::new(0, 900, 1200),
        Err(HeartbeatError::NonPositiveThreshold { name: "check_interval_seconds" })
    ));
}

proptest! {
    /// The classification is monotone in silence: more silence never moves
    /// the phase away from stale.
    #[test]
    fn classification_is_monotone_in_silence(silence_a in 0i64..100_000, delta in 0i64..100_000) {
        let thresholds = thresholds();
        let rank = |phase: &HeartbeatPhase| match phase {
            HeartbeatPhase::Idle => 0,
            HeartbeatPhase::Active => 1,
            HeartbeatPhase::Warning => 2,
            HeartbeatPhase::Stale => 3,
        };
        let eval_at = |silence: i64| {
            let signal = t0() - Duration::seconds(silence);
            evaluate_heartbeat(t0(), true, &thresholds, Some(signal), None)
        };
        let first = eval_at(silence_a);
        let second = eval_at(silence_a + delta);
        prop_assert!(rank(&second.phase) >= rank(&first.phase));
    }

    /// Silence always equals the clamped gap to the latest signal.
    #[test]
    fn silence_matches_signal_gap(gap in -1_000i64..1_000_000) {
        let signal = t0() - Duration::seconds(gap);
        let evaluation = evaluate_heartbeat(t0(), true, &thresholds(), Some(signal), None);
        prop_assert_eq!(evaluation.silence_seconds, gap.max(0) as u64);
    }
}
