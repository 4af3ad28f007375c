// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event metadata records
//!
//! A record is the durable description of an event. Live admission
//! state (holds, queue, confirmed count) lives in the coordinator and
//! never survives a restart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Durable event metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,
    pub name: String,
    /// Fixed capacity; confirmed reservations never exceed this
    pub total_slots: u32,
    pub date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_record_roundtrips_through_json() {
        let record = EventRecord {
            id: EventId(7),
            name: "Launch night".to_string(),
            total_slots: 50,
            date: "2026-09-01T20:00:00Z".parse().expect("valid date"),
        };

        let json = serde_json::to_string(&record).expect("serialize");
        let back: EventRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, record);
    }
}
