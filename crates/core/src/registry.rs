// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection registry: live sessions and what each one owns
//!
//! A session owns at most one hold or one queue entry across the whole
//! system. The registry is the cross-event source of truth for that
//! rule; per-event ledgers and queues only see their own event.

use crate::event::EventId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque identity of one connected client
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a session currently owns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Idle,
    Holding(EventId),
    Queued(EventId),
}

/// Tracks connected sessions, their ownership, and the online count
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    sessions: HashMap<SessionId, Ownership>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn online_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_connected(&self, session_id: &SessionId) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Register a fresh connection as idle
    pub fn on_connect(&mut self, session_id: SessionId) {
        self.sessions.entry(session_id).or_insert(Ownership::Idle);
    }

    /// Drop a connection, returning whatever it still owned
    pub fn on_disconnect(&mut self, session_id: &SessionId) -> Option<Ownership> {
        self.sessions.remove(session_id)
    }

    pub fn ownership(&self, session_id: &SessionId) -> Ownership {
        self.sessions
            .get(session_id)
            .copied()
            .unwrap_or(Ownership::Idle)
    }

    /// True when the session may not take on another hold or queue spot
    pub fn owns_anything(&self, session_id: &SessionId) -> bool {
        !matches!(self.ownership(session_id), Ownership::Idle)
    }

    pub fn set_ownership(&mut self, session_id: &SessionId, ownership: Ownership) {
        if let Some(slot) = self.sessions.get_mut(session_id) {
            *slot = ownership;
        }
    }

    /// Sessions owning a hold or queue spot on the given event
    pub fn sessions_on_event(&self, event_id: EventId) -> Vec<SessionId> {
        self.sessions
            .iter()
            .filter(|(_, o)| matches!(o, Ownership::Holding(e) | Ownership::Queued(e) if *e == event_id))
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
