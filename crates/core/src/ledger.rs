// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slot ledger: authoritative per-event capacity accounting
//!
//! The ledger owns the confirmed count and the set of active holds for
//! one event. Every mutation keeps two bounds intact:
//! `confirmed + holds <= total_slots` and `holds <= max_users`.

use crate::event::EventId;
use crate::hold::{Hold, HoldPhase};
use crate::registry::SessionId;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Per-event capacity state
#[derive(Debug, Clone)]
pub struct SlotLedger {
    total_slots: u32,
    confirmed: u32,
    holds: HashMap<SessionId, Hold>,
}

/// Result of asking for a hold slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Slot granted; the hold is now active in the ledger
    Granted(Hold),
    /// Hold cap reached or no availability left
    NoCapacity,
    /// The session already holds a slot on this event
    AlreadyHeld,
}

/// Result of moving a hold into the details phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeginDetailsOutcome {
    Moved(Hold),
    /// Hold exists but has already left the choice phase
    NotChoosing,
    NotHeld,
}

/// Result of committing a hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed,
    /// Hold exists but details were never begun
    NotAwaitingDetails,
    NotHeld,
}

/// Result of returning a held slot to the pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released(Hold),
    NotHeld,
}

impl SlotLedger {
    pub fn new(total_slots: u32) -> Self {
        Self {
            total_slots,
            confirmed: 0,
            holds: HashMap::new(),
        }
    }

    pub fn total_slots(&self) -> u32 {
        self.total_slots
    }

    pub fn confirmed(&self) -> u32 {
        self.confirmed
    }

    pub fn active_holds(&self) -> u32 {
        self.holds.len() as u32
    }

    /// Slots neither confirmed nor held
    pub fn available(&self) -> u32 {
        self.total_slots
            .saturating_sub(self.confirmed)
            .saturating_sub(self.active_holds())
    }

    /// Every slot is permanently taken; queued sessions can never be served
    pub fn fully_confirmed(&self) -> bool {
        self.confirmed >= self.total_slots
    }

    pub fn hold_for(&self, session_id: &SessionId) -> Option<&Hold> {
        self.holds.get(session_id)
    }

    /// Active holds, for countdown pushes and queue snapshots
    pub fn holds(&self) -> impl Iterator<Item = &Hold> {
        self.holds.values()
    }

    /// Try to grant a hold slot to a session
    ///
    /// Fails with `NoCapacity` when the hold cap is reached or there is
    /// zero availability; the caller decides whether the session queues.
    pub fn try_acquire(
        &mut self,
        event_id: EventId,
        session_id: SessionId,
        max_users: u32,
        now: Instant,
        choice_timeout: Duration,
    ) -> AcquireOutcome {
        if self.holds.contains_key(&session_id) {
            return AcquireOutcome::AlreadyHeld;
        }
        if self.active_holds() >= max_users || self.available() == 0 {
            return AcquireOutcome::NoCapacity;
        }

        let hold = Hold::granted(event_id, session_id.clone(), now, choice_timeout);
        self.holds.insert(session_id, hold.clone());
        AcquireOutcome::Granted(hold)
    }

    /// Move a session's hold from Choosing to AwaitingDetails
    pub fn begin_details(
        &mut self,
        session_id: &SessionId,
        now: Instant,
        reservation_timeout: Duration,
    ) -> BeginDetailsOutcome {
        let Some(hold) = self.holds.get(session_id) else {
            return BeginDetailsOutcome::NotHeld;
        };
        if hold.phase != HoldPhase::Choosing {
            return BeginDetailsOutcome::NotChoosing;
        }

        let moved = hold.begin_details(now, reservation_timeout);
        self.holds.insert(session_id.clone(), moved.clone());
        BeginDetailsOutcome::Moved(moved)
    }

    /// Commit a hold into a confirmed reservation
    ///
    /// Idempotent against double-confirm: the hold is gone after the
    /// first call, so the second observes `NotHeld`.
    pub fn confirm(&mut self, session_id: &SessionId) -> ConfirmOutcome {
        match self.holds.get(session_id) {
            None => ConfirmOutcome::NotHeld,
            Some(hold) if hold.phase != HoldPhase::AwaitingDetails => {
                ConfirmOutcome::NotAwaitingDetails
            }
            Some(_) => {
                self.holds.remove(session_id);
                self.confirmed += 1;
                ConfirmOutcome::Confirmed
            }
        }
    }

    /// Return a held slot to the pool (cancel, expiry, disconnect)
    pub fn release(&mut self, session_id: &SessionId) -> ReleaseOutcome {
        match self.holds.remove(session_id) {
            Some(hold) => ReleaseOutcome::Released(hold),
            None => ReleaseOutcome::NotHeld,
        }
    }

    /// Seed one confirmed reservation at startup, capped at capacity
    pub fn restore_confirmed(&mut self) {
        if self.confirmed < self.total_slots {
            self.confirmed += 1;
        }
    }

    /// Drop every active hold, returning them for timer cleanup
    pub fn drain_holds(&mut self) -> Vec<Hold> {
        self.holds.drain().map(|(_, hold)| hold).collect()
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
