// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use fs2::FileExt;
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};
use usher_core::{Coordinator, Settings, SystemClock};
use usher_storage::{Catalog, StoreError};

use crate::hub::BroadcastHub;
use crate::server::ServerContext;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for the catalog, lock file, and log
    pub state_dir: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
}

impl Config {
    /// Build config from the environment
    pub fn from_env() -> Result<Self, LifecycleError> {
        let state_dir = state_dir()?;
        Ok(Self {
            socket_path: socket_path(),
            lock_path: state_dir.join("usherd.pid"),
            log_path: state_dir.join("usherd.log"),
            state_dir,
        })
    }
}

/// Daemon state during operation
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Unix socket listener
    pub listener: UnixListener,
    /// State shared with every connection task
    pub ctx: Arc<ServerContext>,
}

impl DaemonState {
    /// Shutdown the daemon gracefully
    pub fn shutdown(&self) {
        info!("Shutting down daemon...");

        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            }
        }

        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        // Lock file is released automatically when self.lock_file is dropped

        info!("Daemon shutdown complete");
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Catalog error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config) {
        Ok(state) => Ok(state),
        // A lock failure means another daemon owns these files; leave
        // them alone. Anything else is ours to clean up.
        Err(e @ LifecycleError::LockFailed(_)) => Err(e),
        Err(e) => {
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    // 1. Create directories
    std::fs::create_dir_all(&config.state_dir)?;
    if let Some(parent) = config.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // 2. Acquire lock file FIRST - prevents races
    let lock_file = File::create(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file
    use std::io::Write;
    let mut lock_file = lock_file;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file; // Reborrow as immutable

    // 3. Load the catalog before binding (fail fast on corrupt state)
    let catalog = Catalog::open(&config.state_dir)?;
    let settings = match catalog.load_settings() {
        Ok(settings) => match settings.validate() {
            Ok(()) => settings,
            Err(e) => {
                warn!("Persisted settings invalid ({e}), using defaults");
                Settings::default()
            }
        },
        Err(e) => return Err(e.into()),
    };
    let stored_events = catalog.load_events()?;

    // 4. Wire the coordinator to the broadcast hub and seed it
    let hub = BroadcastHub::new();
    let coordinator = Coordinator::new(SystemClock, Arc::new(hub.clone()), settings);
    for stored in &stored_events {
        coordinator.load_event(stored.record.clone(), stored.confirmed);
    }
    info!("Loaded catalog: {} events", stored_events.len());

    // 5. Remove stale socket and bind (LAST - only after all validation passes)
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    info!("Daemon started, state dir: {}", config.state_dir.display());

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        listener,
        ctx: Arc::new(ServerContext::new(coordinator, hub, catalog)),
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

/// Get the state directory for usher
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("USHER_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }

    // Use XDG_STATE_HOME or default to ~/.local/state
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("usher"));
    }

    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/usher"))
}

/// Path of the daemon's Unix socket
///
/// Lives under /tmp/usher by default to keep paths short (macOS
/// SUN_LEN = 104). Can be overridden with USHER_SOCKET_DIR for testing.
pub fn socket_path() -> PathBuf {
    let dir = match std::env::var("USHER_SOCKET_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => PathBuf::from("/tmp/usher"),
    };
    dir.join("usherd.sock")
}
