// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! usher-daemon: background process coordinating reservation admission
//!
//! Owns the socket server, the broadcast hub, and the heartbeat loop
//! that drives hold expiry and countdown pushes.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod hub;
pub mod lifecycle;
pub mod protocol;
pub mod server;

pub use hub::BroadcastHub;
pub use protocol::{
    ClientMessage, EventSummary, ProtocolError, ServerMessage, DEFAULT_TIMEOUT, PROTOCOL_VERSION,
};
pub use server::ServerContext;
