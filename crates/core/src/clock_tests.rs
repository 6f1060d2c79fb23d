// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::new();
    let start = clock.now_utc();
    clock.advance(Duration::seconds(90));
    assert_eq!(clock.now_utc() - start, Duration::seconds(90));
}

#[test]
fn fake_clock_clones_share_state() {
    let clock = FakeClock::new();
    let other = clock.clone();
    clock.advance(Duration::minutes(5));
    assert_eq!(clock.now_utc(), other.now_utc());
}

#[test]
fn fake_clock_set_overrides() {
    let clock = FakeClock::new();
    let target = clock.now_utc() + Duration::hours(2);
    clock.set(target);
    assert_eq!(clock.now_utc(), target);
}

#[test]
fn system_clock_is_monotonic_enough() {
    let clock = SystemClock;
    let a = clock.now_utc();
    let b = clock.now_utc();
    assert!(b >= a);
}
