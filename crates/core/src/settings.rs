// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mutable admission parameters
//!
//! Settings are consulted at the moment a hold or phase is created.
//! Deadlines already scheduled keep their original fire time; an
//! update never rescales an in-flight countdown.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Global admission parameters
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// How many sessions may hold a pending reservation at once
    pub max_users: u32,
    /// Time allowed in the choice phase before a hold expires
    #[serde(with = "humantime_serde")]
    pub choice_timeout: Duration,
    /// Time allowed to submit contact details before a hold expires
    #[serde(with = "humantime_serde")]
    pub reservation_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_users: 3,
            choice_timeout: Duration::from_secs(30),
            reservation_timeout: Duration::from_secs(120),
        }
    }
}

/// Rejected settings update
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("max_users must be at least 1")]
    ZeroMaxUsers,

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

impl Settings {
    /// Validate an update before it is applied
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_users == 0 {
            return Err(SettingsError::ZeroMaxUsers);
        }
        if self.choice_timeout.is_zero() {
            return Err(SettingsError::ZeroTimeout("choice_timeout"));
        }
        if self.reservation_timeout.is_zero() {
            return Err(SettingsError::ZeroTimeout("reservation_timeout"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
