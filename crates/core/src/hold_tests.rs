// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::{Clock, FakeClock};

fn session(name: &str) -> SessionId {
    SessionId(name.to_string())
}

#[test]
fn granted_hold_starts_in_choice_phase() {
    let clock = FakeClock::new();
    let hold = Hold::granted(
        EventId(1),
        session("a"),
        clock.now(),
        Duration::from_secs(30),
    );

    assert_eq!(hold.phase, HoldPhase::Choosing);
    assert_eq!(hold.seconds_remaining(clock.now()), 30);
}

#[test]
fn begin_details_replaces_the_deadline() {
    let clock = FakeClock::new();
    let hold = Hold::granted(
        EventId(1),
        session("a"),
        clock.now(),
        Duration::from_secs(30),
    );

    clock.advance(Duration::from_secs(10));
    let hold = hold.begin_details(clock.now(), Duration::from_secs(120));

    assert_eq!(hold.phase, HoldPhase::AwaitingDetails);
    assert_eq!(hold.seconds_remaining(clock.now()), 120);
}

#[test]
fn countdown_saturates_at_zero_past_the_deadline() {
    let clock = FakeClock::new();
    let hold = Hold::granted(
        EventId(1),
        session("a"),
        clock.now(),
        Duration::from_secs(5),
    );

    clock.advance(Duration::from_secs(9));
    assert_eq!(hold.seconds_remaining(clock.now()), 0);
}

#[test]
fn timer_id_is_stable_per_event_and_session() {
    assert_eq!(
        Hold::timer_id(EventId(3), &session("abc")),
        "hold-3-abc".to_string()
    );
}
