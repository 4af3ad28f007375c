// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! usher-core: Reservation admission coordinator
//!
//! This crate provides:
//! - Per-event capacity state machines (slot ledger, admission queue)
//! - Two-phase hold deadlines on a testable clock
//! - The coordinator orchestrating grants, queueing, promotion,
//!   expiry, and broadcast notices
//!
//! Everything here is transport-free; the daemon wires it to sockets.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod clock;
pub mod id;

pub mod coordinator;
pub mod event;
pub mod hold;
pub mod ledger;
pub mod notice;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod settings;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use coordinator::{
    Coordinator, CoordinatorError, EventSnapshot, GuestDetails, ReserveOutcome,
};
pub use event::{EventId, EventRecord};
pub use hold::{Hold, HoldPhase};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use notice::{Notice, NoticeScope, Publisher, RecordingPublisher};
pub use queue::{AdmissionQueue, EnqueueOutcome, QueueEntry};
pub use registry::{ConnectionRegistry, Ownership, SessionId};
pub use scheduler::{Deadline, DeadlineKind, Scheduler};
pub use settings::{Settings, SettingsError};
