// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! usher-storage: durable catalog of event metadata and settings
//!
//! Only administrative state is persisted. Holds and queue entries are
//! deliberately in-memory: they do not survive a daemon restart.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod catalog;

pub use catalog::{Catalog, StoreError, StoredEvent};
