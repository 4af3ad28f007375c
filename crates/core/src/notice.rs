// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broadcast notices emitted by the coordinator
//!
//! One variant per server push in the real-time protocol. The
//! coordinator publishes notices while still holding the per-event
//! lock, so subscribers observe one event's notices in the order the
//! underlying transitions committed.

use crate::event::{EventId, EventRecord};
use crate::registry::SessionId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Who should receive a notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeScope {
    /// Every session watching the event
    Event(EventId),
    /// One session only
    Session(SessionId),
    /// Every connected session
    Global,
}

/// A state-change notification fanned out to watching sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    /// Full snapshot of an event's wait line and live hold countdowns
    QueueUpdate {
        event_id: EventId,
        queue: Vec<SessionId>,
        timers: BTreeMap<SessionId, u64>,
    },
    /// Incremental countdown tick for one session's hold
    TimerUpdate {
        event_id: EventId,
        session_id: SessionId,
        seconds_remaining: u64,
    },
    /// Available-slot count changed
    EventUpdated { id: EventId, slots: u32 },
    /// A hold was committed into a confirmed reservation
    ReservationConfirmed { event_id: EventId, user: SessionId },
    /// A hold expired without confirmation
    ReservationTimeout { event_id: EventId },
    /// Live connection count changed
    OnlineUsers { count: usize },
    EventCreated { record: EventRecord },
    EventDeleted { id: EventId },
    /// Server-initiated rejection pushed to one session (e.g. a queue
    /// spot that can no longer be served); not a protocol fault
    Error {
        session_id: SessionId,
        message: String,
    },
}

impl Notice {
    /// Delivery scope for routing in the broadcast hub
    pub fn scope(&self) -> NoticeScope {
        match self {
            Notice::QueueUpdate { event_id, .. }
            | Notice::TimerUpdate { event_id, .. }
            | Notice::ReservationConfirmed { event_id, .. }
            | Notice::ReservationTimeout { event_id } => NoticeScope::Event(*event_id),
            Notice::EventUpdated { id, .. } => NoticeScope::Event(*id),
            Notice::Error { session_id, .. } => NoticeScope::Session(session_id.clone()),
            Notice::OnlineUsers { .. }
            | Notice::EventCreated { .. }
            | Notice::EventDeleted { .. } => NoticeScope::Global,
        }
    }

    /// Notice name for logging
    /// Format: "category:action"
    pub fn name(&self) -> &'static str {
        match self {
            Notice::QueueUpdate { .. } => "queue:update",
            Notice::TimerUpdate { .. } => "timer:update",
            Notice::EventUpdated { .. } => "event:updated",
            Notice::ReservationConfirmed { .. } => "reservation:confirmed",
            Notice::ReservationTimeout { .. } => "reservation:timeout",
            Notice::OnlineUsers { .. } => "online:users",
            Notice::EventCreated { .. } => "event:created",
            Notice::EventDeleted { .. } => "event:deleted",
            Notice::Error { .. } => "session:error",
        }
    }
}

/// Fan-out seam between the coordinator and the transport layer
///
/// Delivery must be best-effort per session: a slow or disconnected
/// subscriber never blocks the publishing transition.
pub trait Publisher: Send + Sync {
    fn publish(&self, notice: Notice);
}

/// Publisher that records notices, for tests
#[derive(Default)]
pub struct RecordingPublisher {
    notices: std::sync::Mutex<Vec<Notice>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notices published so far, in publish order
    pub fn taken(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notice);
    }
}

#[cfg(test)]
#[path = "notice_tests.rs"]
mod tests;
