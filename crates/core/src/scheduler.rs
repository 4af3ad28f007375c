// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deadline scheduler for hold expiries
//!
//! One cancellable one-shot entry per hold phase. The daemon polls the
//! scheduler from its heartbeat loop and routes fired deadlines back
//! into the coordinator, which re-checks state under the per-event
//! lock; a deadline that lost the race to a confirm or cancel finds
//! the hold gone and does nothing.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::time::Instant;

use crate::event::EventId;
use crate::registry::SessionId;

/// The kind of scheduled deadline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeadlineKind {
    /// A hold's current phase ran out of time
    HoldExpiry {
        event_id: EventId,
        session_id: SessionId,
    },
}

/// A scheduled deadline
#[derive(Debug, Clone)]
pub struct Deadline {
    pub id: String,
    pub fire_at: Instant,
    pub kind: DeadlineKind,
}

impl PartialEq for Deadline {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.id == other.id
    }
}

impl Eq for Deadline {}

impl PartialOrd for Deadline {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Deadline {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Min-heap: earliest first
        Reverse(self.fire_at).cmp(&Reverse(other.fire_at))
    }
}

/// Manages pending deadlines
#[derive(Debug, Default)]
pub struct Scheduler {
    items: BinaryHeap<Deadline>,
    cancelled: HashSet<String>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a one-shot deadline
    ///
    /// Re-using an ID replaces the pending entry: the old one is
    /// cancelled and the new one scheduled.
    pub fn schedule(&mut self, id: impl Into<String>, fire_at: Instant, kind: DeadlineKind) {
        let id = id.into();
        self.cancelled.remove(&id);
        self.items.retain(|item| item.id != id);
        self.items.push(Deadline { id, fire_at, kind });
    }

    /// Cancel a pending deadline
    pub fn cancel(&mut self, id: &str) {
        self.cancelled.insert(id.to_string());
    }

    /// Take all deadlines due at or before `now`, earliest first
    pub fn poll(&mut self, now: Instant) -> Vec<Deadline> {
        let mut fired = Vec::new();

        while let Some(next) = self.items.peek() {
            if next.fire_at > now {
                break;
            }
            let Some(item) = self.items.pop() else {
                break;
            };
            if self.cancelled.remove(&item.id) {
                continue;
            }
            fired.push(item);
        }

        fired
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Earliest pending fire time, if any
    pub fn next_fire_time(&self) -> Option<Instant> {
        self.items.peek().map(|item| item.fire_at)
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
