// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-out of coordinator notices to connected sessions.
//!
//! Each connection registers an unbounded channel here; its writer task
//! drains the channel onto the socket. Direct replies and broadcast
//! pushes go through the same channel, so a session observes them in
//! the order the daemon produced them. Sends are best-effort: a closed
//! receiver just means the session is going away.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::mpsc;
use tracing::trace;
use usher_core::{EventId, Notice, NoticeScope, Publisher, SessionId};

use crate::protocol::ServerMessage;

struct Subscriber {
    watching: HashSet<EventId>,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

/// Routes server messages to sessions by notice scope
#[derive(Clone, Default)]
pub struct BroadcastHub {
    sessions: Arc<RwLock<HashMap<SessionId, Subscriber>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session and hand back the receiving end of its channel
    pub fn register(&self, session_id: SessionId) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.write().insert(
            session_id,
            Subscriber {
                watching: HashSet::new(),
                tx,
            },
        );
        rx
    }

    /// Remove a session; drops its sender so the writer task drains out
    pub fn deregister(&self, session_id: &SessionId) {
        self.write().remove(session_id);
    }

    pub fn watch(&self, session_id: &SessionId, event_id: EventId) {
        if let Some(subscriber) = self.write().get_mut(session_id) {
            subscriber.watching.insert(event_id);
        }
    }

    pub fn unwatch(&self, session_id: &SessionId, event_id: EventId) {
        if let Some(subscriber) = self.write().get_mut(session_id) {
            subscriber.watching.remove(&event_id);
        }
    }

    /// Queue a message for one session
    pub fn send_to(&self, session_id: &SessionId, message: ServerMessage) {
        if let Some(subscriber) = self.read().get(session_id) {
            let _ = subscriber.tx.send(message);
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<SessionId, Subscriber>> {
        self.sessions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SessionId, Subscriber>> {
        self.sessions.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Publisher for BroadcastHub {
    fn publish(&self, notice: Notice) {
        trace!(notice = notice.name(), "fan out");
        let scope = notice.scope();
        let message = ServerMessage::from(notice);
        let sessions = self.read();

        match scope {
            NoticeScope::Event(event_id) => {
                for subscriber in sessions.values() {
                    if subscriber.watching.contains(&event_id) {
                        let _ = subscriber.tx.send(message.clone());
                    }
                }
            }
            NoticeScope::Session(session_id) => {
                if let Some(subscriber) = sessions.get(&session_id) {
                    let _ = subscriber.tx.send(message);
                }
            }
            NoticeScope::Global => {
                for subscriber in sessions.values() {
                    let _ = subscriber.tx.send(message.clone());
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
