// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-phase hold lifecycle
//!
//! A hold is a soft claim on one slot. It starts in the choice phase
//! the instant it is granted and moves to the details phase when the
//! owning session explicitly continues. Each phase carries exactly one
//! deadline; whichever of {confirm, cancel, expiry, disconnect} reaches
//! the per-event lock first resolves the hold, and the others see it
//! already gone.

use crate::event::EventId;
use crate::registry::SessionId;
use std::time::{Duration, Instant};

/// Phase of a pending hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldPhase {
    /// Deciding whether to proceed (choice_timeout applies)
    Choosing,
    /// Filling in contact details (reservation_timeout applies)
    AwaitingDetails,
}

/// A temporary, revocable claim on one event slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hold {
    pub event_id: EventId,
    pub session_id: SessionId,
    pub phase: HoldPhase,
    pub expires_at: Instant,
}

impl Hold {
    /// Create a hold in the choice phase
    pub fn granted(
        event_id: EventId,
        session_id: SessionId,
        now: Instant,
        choice_timeout: Duration,
    ) -> Self {
        Self {
            event_id,
            session_id,
            phase: HoldPhase::Choosing,
            expires_at: now + choice_timeout,
        }
    }

    /// Move from Choosing to AwaitingDetails with a fresh deadline
    pub fn begin_details(&self, now: Instant, reservation_timeout: Duration) -> Self {
        Self {
            phase: HoldPhase::AwaitingDetails,
            expires_at: now + reservation_timeout,
            ..self.clone()
        }
    }

    /// Server-computed countdown pushed to clients
    pub fn seconds_remaining(&self, now: Instant) -> u64 {
        self.expires_at.saturating_duration_since(now).as_secs()
    }

    /// Scheduler entry ID for this hold's current deadline
    pub fn timer_id(event_id: EventId, session_id: &SessionId) -> String {
        format!("hold-{}-{}", event_id, session_id)
    }
}

#[cfg(test)]
#[path = "hold_tests.rs"]
mod tests;
