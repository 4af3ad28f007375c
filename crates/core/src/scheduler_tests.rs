// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::{Clock, FakeClock};
use std::time::Duration;

fn expiry(event: u64, name: &str) -> DeadlineKind {
    DeadlineKind::HoldExpiry {
        event_id: EventId(event),
        session_id: SessionId(name.to_string()),
    }
}

#[test]
fn deadlines_fire_at_their_scheduled_time() {
    let clock = FakeClock::new();
    let mut scheduler = Scheduler::new();

    let now = clock.now();
    scheduler.schedule("d-1", now + Duration::from_secs(10), expiry(1, "a"));
    scheduler.schedule("d-2", now + Duration::from_secs(5), expiry(1, "b"));

    assert!(scheduler.poll(now).is_empty());

    clock.advance(Duration::from_secs(5));
    let fired = scheduler.poll(clock.now());
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].id, "d-2");

    clock.advance(Duration::from_secs(5));
    let fired = scheduler.poll(clock.now());
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].id, "d-1");
}

#[test]
fn cancelled_deadlines_never_fire() {
    let clock = FakeClock::new();
    let mut scheduler = Scheduler::new();

    scheduler.schedule("d-1", clock.now() + Duration::from_secs(10), expiry(1, "a"));
    scheduler.cancel("d-1");

    clock.advance(Duration::from_secs(15));
    assert!(scheduler.poll(clock.now()).is_empty());
    assert!(scheduler.is_empty());
}

#[test]
fn rescheduling_an_id_replaces_the_pending_entry() {
    let clock = FakeClock::new();
    let mut scheduler = Scheduler::new();

    let now = clock.now();
    scheduler.schedule("d-1", now + Duration::from_secs(10), expiry(1, "a"));
    scheduler.schedule("d-1", now + Duration::from_secs(30), expiry(1, "a"));

    clock.advance(Duration::from_secs(10));
    assert!(scheduler.poll(clock.now()).is_empty());

    clock.advance(Duration::from_secs(20));
    assert_eq!(scheduler.poll(clock.now()).len(), 1);
}

#[test]
fn schedule_after_cancel_with_same_id_still_fires() {
    let clock = FakeClock::new();
    let mut scheduler = Scheduler::new();

    scheduler.schedule("d-1", clock.now() + Duration::from_secs(5), expiry(1, "a"));
    scheduler.cancel("d-1");
    scheduler.schedule("d-1", clock.now() + Duration::from_secs(5), expiry(1, "a"));

    clock.advance(Duration::from_secs(5));
    assert_eq!(scheduler.poll(clock.now()).len(), 1);
}

#[test]
fn due_deadlines_come_out_earliest_first() {
    let clock = FakeClock::new();
    let mut scheduler = Scheduler::new();

    let now = clock.now();
    scheduler.schedule("late", now + Duration::from_secs(30), expiry(1, "a"));
    scheduler.schedule("early", now + Duration::from_secs(10), expiry(1, "b"));
    scheduler.schedule("mid", now + Duration::from_secs(20), expiry(1, "c"));

    clock.advance(Duration::from_secs(35));
    let fired: Vec<_> = scheduler.poll(clock.now()).into_iter().map(|d| d.id).collect();
    assert_eq!(fired, vec!["early", "mid", "late"]);
}

#[test]
fn next_fire_time_tracks_the_earliest_entry() {
    let clock = FakeClock::new();
    let mut scheduler = Scheduler::new();
    assert_eq!(scheduler.next_fire_time(), None);

    let now = clock.now();
    scheduler.schedule("d-1", now + Duration::from_secs(20), expiry(1, "a"));
    scheduler.schedule("d-2", now + Duration::from_secs(10), expiry(1, "b"));
    assert_eq!(scheduler.next_fire_time(), Some(now + Duration::from_secs(10)));
}
