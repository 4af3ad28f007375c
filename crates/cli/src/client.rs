// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands
//!
//! Holds one persistent connection: the daemon treats a connection as
//! a session, so request/reply and watch pushes share the stream.

use std::path::PathBuf;
use std::process::Command;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use usher_core::{EventId, Settings};
use usher_daemon::lifecycle;
use usher_daemon::protocol::{
    self, ClientMessage, EventSummary, ProtocolError, ServerMessage, DEFAULT_TIMEOUT,
};

// Timeout configuration (env vars in milliseconds)
fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Timeout for request/reply exchanges
pub fn timeout_ipc() -> Duration {
    parse_duration_ms("USHER_TIMEOUT_IPC_MS").unwrap_or(DEFAULT_TIMEOUT)
}

/// Timeout for waiting for daemon to start
pub fn timeout_connect() -> Duration {
    parse_duration_ms("USHER_TIMEOUT_CONNECT_MS").unwrap_or(DEFAULT_TIMEOUT)
}

/// Timeout for waiting for process to exit
pub fn timeout_exit() -> Duration {
    parse_duration_ms("USHER_TIMEOUT_EXIT_MS").unwrap_or(Duration::from_secs(2))
}

/// Polling interval for retries
pub fn poll_interval() -> Duration {
    parse_duration_ms("USHER_POLL_INTERVAL_MS").unwrap_or(Duration::from_millis(50))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running")]
    DaemonNotRunning,

    #[error("Failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("Connection timeout waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Unexpected response from daemon")]
    UnexpectedResponse,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Daemon client holding an open session
pub struct DaemonClient {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
}

impl DaemonClient {
    /// Connect to an existing daemon (no auto-start)
    pub async fn connect() -> Result<Self, ClientError> {
        let socket_path = lifecycle::socket_path();
        if !socket_path.exists() {
            return Err(ClientError::DaemonNotRunning);
        }

        let stream = UnixStream::connect(&socket_path)
            .await
            .map_err(|_| ClientError::DaemonNotRunning)?;
        let (reader, writer) = stream.into_split();
        Ok(Self { reader, writer })
    }

    /// Connect to the daemon, starting it in the background if needed
    pub async fn connect_or_start() -> Result<Self, ClientError> {
        match Self::connect().await {
            Ok(client) => Ok(client),
            Err(ClientError::DaemonNotRunning) => {
                let child = start_daemon_background()?;
                Self::connect_with_retry(timeout_connect(), child).await
            }
            Err(e) => Err(e),
        }
    }

    async fn connect_with_retry(
        timeout: Duration,
        mut child: std::process::Child,
    ) -> Result<Self, ClientError> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            // Check if daemon process exited early (startup failure)
            if let Ok(Some(status)) = child.try_wait() {
                if let Some(err) = read_startup_error() {
                    return Err(ClientError::DaemonStartFailed(err));
                }
                return Err(ClientError::DaemonStartFailed(format!(
                    "exited with {}",
                    status
                )));
            }

            match Self::connect().await {
                Ok(client) => return Ok(client),
                Err(ClientError::DaemonNotRunning) => {
                    tokio::time::sleep(poll_interval()).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(ClientError::DaemonStartTimeout)
    }

    /// Send a request and wait for its reply, skipping broadcast pushes
    pub async fn request(&mut self, message: ClientMessage) -> Result<ServerMessage, ClientError> {
        let data = protocol::encode(&message)?;
        tokio::time::timeout(
            timeout_ipc(),
            protocol::write_message(&mut self.writer, &data),
        )
        .await
        .map_err(|_| ProtocolError::Timeout)??;

        loop {
            let reply = tokio::time::timeout(
                timeout_ipc(),
                protocol::read_server_message(&mut self.reader),
            )
            .await
            .map_err(|_| ProtocolError::Timeout)??;

            if !reply.is_push() {
                return Ok(reply);
            }
        }
    }

    /// Wait for the next server message, without a deadline (watch mode)
    pub async fn next_message(&mut self) -> Result<ServerMessage, ClientError> {
        Ok(protocol::read_server_message(&mut self.reader).await?)
    }

    /// Get daemon protocol version via Hello handshake
    pub async fn hello(&mut self) -> Result<String, ClientError> {
        match self
            .request(ClientMessage::Hello {
                version: env!("CARGO_PKG_VERSION").to_string(),
            })
            .await?
        {
            ServerMessage::Hello { version } => Ok(version),
            ServerMessage::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Subscribe to an event's pushes
    pub async fn watch(&mut self, event_id: EventId) -> Result<(), ClientError> {
        match self.request(ClientMessage::Watch { event_id }).await? {
            ServerMessage::Ack { .. } => Ok(()),
            ServerMessage::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn list_events(&mut self) -> Result<Vec<EventSummary>, ClientError> {
        match self.request(ClientMessage::ListEvents).await? {
            ServerMessage::Events { events } => Ok(events),
            ServerMessage::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn create_event(
        &mut self,
        name: String,
        slots: u32,
        date: chrono::DateTime<chrono::Utc>,
    ) -> Result<String, ClientError> {
        match self
            .request(ClientMessage::CreateEvent { name, slots, date })
            .await?
        {
            ServerMessage::Ack { message } => Ok(message),
            ServerMessage::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn delete_event(&mut self, event_id: EventId) -> Result<String, ClientError> {
        match self.request(ClientMessage::DeleteEvent { event_id }).await? {
            ServerMessage::Ack { message } => Ok(message),
            ServerMessage::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn get_settings(&mut self) -> Result<Settings, ClientError> {
        match self.request(ClientMessage::GetSettings).await? {
            ServerMessage::Settings { settings } => Ok(settings),
            ServerMessage::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn update_settings(&mut self, settings: Settings) -> Result<(), ClientError> {
        match self
            .request(ClientMessage::UpdateSettings { settings })
            .await?
        {
            ServerMessage::Ack { .. } => Ok(()),
            ServerMessage::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Get daemon status: uptime, online sessions, event count
    pub async fn status(&mut self) -> Result<(u64, usize, usize), ClientError> {
        match self.request(ClientMessage::Status).await? {
            ServerMessage::Status {
                uptime_secs,
                online_sessions,
                events,
            } => Ok((uptime_secs, online_sessions, events)),
            ServerMessage::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Request daemon shutdown
    pub async fn shutdown(&mut self) -> Result<(), ClientError> {
        match self.request(ClientMessage::Shutdown).await? {
            ServerMessage::ShuttingDown => Ok(()),
            ServerMessage::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}

/// Start the daemon in the background, returning the child process handle
fn start_daemon_background() -> Result<std::process::Child, ClientError> {
    let usherd_path = find_usherd_binary();

    Command::new(&usherd_path)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(e.to_string()))
}

/// Stop the daemon (graceful first, then forceful)
/// Returns true if daemon was stopped, false if it wasn't running
pub async fn daemon_stop() -> Result<bool, ClientError> {
    let mut client = match DaemonClient::connect().await {
        Ok(c) => c,
        Err(ClientError::DaemonNotRunning) => {
            cleanup_stale_pid();
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    // Try graceful shutdown (timeout handled by request())
    let shutdown_result = client.shutdown().await;

    if let Some(pid) = read_daemon_pid() {
        if shutdown_result.is_ok() {
            // Graceful shutdown succeeded, wait for process to exit
            wait_for_exit(pid, timeout_exit()).await;
        }

        // Force kill if still running
        if process_exists(pid) {
            force_kill_daemon(pid);
            wait_for_exit(pid, timeout_exit()).await;
        }
    }

    cleanup_stale_pid();
    Ok(true)
}

/// Wait for a process to exit
async fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !process_exists(pid) {
            return true;
        }
        tokio::time::sleep(poll_interval()).await;
    }
    false
}

/// Find the usherd binary
fn find_usherd_binary() -> PathBuf {
    // Explicit override (used by tests to ensure correct binary)
    if let Ok(path) = std::env::var("USHER_DAEMON_BINARY") {
        return PathBuf::from(path);
    }

    // Check current executable's directory
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("usherd");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    // Fall back to PATH lookup
    PathBuf::from("usherd")
}

/// Clean up orphaned PID file after the daemon is gone
fn cleanup_stale_pid() {
    let Ok(state_dir) = lifecycle::state_dir() else {
        return;
    };
    let pid_path = state_dir.join("usherd.pid");
    if pid_path.exists() {
        let _ = std::fs::remove_file(&pid_path);
    }
}

/// Get the PID from the daemon PID file, if it exists
pub fn read_daemon_pid() -> Option<u32> {
    let state_dir = lifecycle::state_dir().ok()?;
    let content = std::fs::read_to_string(state_dir.join("usherd.pid")).ok()?;
    content.trim().parse::<u32>().ok()
}

/// Check if a process with the given PID exists
pub fn process_exists(pid: u32) -> bool {
    // Use kill -0 to check if process exists without sending a signal
    Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Force kill a daemon process
pub fn force_kill_daemon(pid: u32) -> bool {
    Command::new("kill")
        .args(["-9", &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Startup marker prefix that daemon writes to log before anything else.
/// Full format: "--- usherd: starting (pid: 12345) ---"
const STARTUP_MARKER_PREFIX: &str = "--- usherd: starting (pid: ";

/// Read daemon log from startup marker, looking for errors.
/// Returns the error message if found, None otherwise.
pub fn read_startup_error() -> Option<String> {
    let state_dir = lifecycle::state_dir().ok()?;
    let content = std::fs::read_to_string(state_dir.join("usherd.log")).ok()?;

    // Find the last startup marker
    let start_pos = content.rfind(STARTUP_MARKER_PREFIX)?;
    let startup_log = &content[start_pos..];

    let errors: Vec<&str> = startup_log
        .lines()
        .filter(|line| line.contains(" ERROR ") || line.contains("Failed to start"))
        .collect();

    if errors.is_empty() {
        return None;
    }

    // Extract just the error messages (strip timestamp/level prefix)
    let error_messages: Vec<String> = errors
        .iter()
        .filter_map(|line| line.split_once(": ").map(|(_, msg)| msg.to_string()))
        .collect();

    if error_messages.is_empty() {
        Some(errors.join("\n"))
    } else {
        Some(error_messages.join("\n"))
    }
}
