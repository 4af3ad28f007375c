// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission queue: per-event FIFO of sessions waiting for a hold
//!
//! Strict arrival order, no priorities. Removal of a departed session
//! preserves the relative order of the survivors.

use crate::registry::SessionId;
use std::collections::VecDeque;
use std::time::Instant;

/// One session waiting in line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub session_id: SessionId,
    pub enqueued_at: Instant,
}

/// Result of joining the wait line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Zero-based position in line
    Enqueued { position: usize },
    AlreadyQueued,
}

/// FIFO wait line for one event
#[derive(Debug, Clone, Default)]
pub struct AdmissionQueue {
    entries: VecDeque<QueueEntry>,
}

impl AdmissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.entries.iter().any(|e| &e.session_id == session_id)
    }

    /// Append to the tail; duplicate sessions are rejected
    pub fn enqueue(&mut self, session_id: SessionId, now: Instant) -> EnqueueOutcome {
        if self.contains(&session_id) {
            return EnqueueOutcome::AlreadyQueued;
        }
        self.entries.push_back(QueueEntry {
            session_id,
            enqueued_at: now,
        });
        EnqueueOutcome::Enqueued {
            position: self.entries.len() - 1,
        }
    }

    /// Remove and return the head of the line
    pub fn dequeue_front(&mut self) -> Option<QueueEntry> {
        self.entries.pop_front()
    }

    /// Drop a session from anywhere in the line (disconnect, cancel)
    ///
    /// O(n), fine for the short lines this serves.
    pub fn remove(&mut self, session_id: &SessionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| &e.session_id != session_id);
        self.entries.len() != before
    }

    /// Drop everyone, returning them in line order
    pub fn drain(&mut self) -> Vec<QueueEntry> {
        self.entries.drain(..).collect()
    }

    /// Current line, head first, for queue_update broadcasts
    pub fn snapshot(&self) -> Vec<SessionId> {
        self.entries.iter().map(|e| e.session_id.clone()).collect()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
