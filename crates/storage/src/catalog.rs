// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON snapshot storage for event records and settings

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use usher_core::{EventRecord, Settings};

/// Errors that can occur reading or writing the catalog
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One persisted event: its record plus the permanently taken slots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub record: EventRecord,
    pub confirmed: u32,
}

/// File-backed catalog under the daemon state directory
pub struct Catalog {
    events_path: PathBuf,
    settings_path: PathBuf,
}

impl Catalog {
    /// Open a catalog rooted at the given directory, creating it if needed
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            events_path: dir.join("events.json"),
            settings_path: dir.join("settings.json"),
        })
    }

    /// Load all persisted events; a missing file is an empty catalog
    pub fn load_events(&self) -> Result<Vec<StoredEvent>, StoreError> {
        match fs::read_to_string(&self.events_path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the persisted event set
    pub fn save_events(&self, events: &[StoredEvent]) -> Result<(), StoreError> {
        write_snapshot(&self.events_path, &serde_json::to_vec_pretty(events)?)
    }

    /// Load persisted settings; a missing file means defaults
    pub fn load_settings(&self) -> Result<Settings, StoreError> {
        match fs::read_to_string(&self.settings_path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        write_snapshot(&self.settings_path, &serde_json::to_vec_pretty(settings)?)
    }
}

/// Write via a temp file and rename so readers never see a torn file
fn write_snapshot(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
