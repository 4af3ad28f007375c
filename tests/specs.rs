//! Behavioral specifications for the usher workspace.
//!
//! These tests run a real daemon in-process (socket listener plus
//! connection tasks) and drive it over the wire protocol.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// daemon/
#[path = "specs/daemon/admission.rs"]
mod daemon_admission;
#[path = "specs/daemon/lifecycle.rs"]
mod daemon_lifecycle;
#[path = "specs/daemon/persistence.rs"]
mod daemon_persistence;
