// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol between clients and usherd.
//!
//! Messages are JSON frames with a 4-byte big-endian length prefix,
//! exchanged over a Unix domain socket. A connection is a session: the
//! client sends [`ClientMessage`]s and receives [`ServerMessage`]s,
//! which are either direct replies or pushes fanned out by the hub.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use usher_core::{EventId, EventRecord, EventSnapshot, SessionId, Settings};

/// Protocol version for Hello handshake
pub const PROTOCOL_VERSION: &str = "1";

/// Default timeout for client request/reply exchanges
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on a single frame; anything larger is a corrupt stream
const MAX_FRAME_LEN: u32 = 1024 * 1024;

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation timed out")]
    Timeout,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Frame too large: {0} bytes")]
    FrameTooLarge(u32),
}

/// Messages a client sends to the daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Version handshake
    Hello { version: String },
    /// Subscribe to an event's pushes
    Watch { event_id: EventId },
    Unwatch { event_id: EventId },
    /// Ask for a hold slot on an event
    Reserve { event_id: EventId },
    /// Move an existing hold from choosing to the details phase
    BeginDetails { event_id: EventId },
    /// Commit a hold into a confirmed reservation
    ConfirmReservation {
        event_id: EventId,
        name: String,
        phone: String,
    },
    /// Give up a hold or queue spot
    CancelReservation { event_id: EventId },
    ListEvents,
    CreateEvent {
        name: String,
        slots: u32,
        date: DateTime<Utc>,
    },
    DeleteEvent { event_id: EventId },
    GetSettings,
    UpdateSettings { settings: Settings },
    Status,
    Shutdown,
}

/// One event as reported to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: EventId,
    pub name: String,
    pub date: DateTime<Utc>,
    pub total_slots: u32,
    pub available: u32,
    pub active_holds: u32,
    pub confirmed: u32,
    pub queue_len: usize,
}

impl From<EventSnapshot> for EventSummary {
    fn from(snapshot: EventSnapshot) -> Self {
        Self {
            id: snapshot.record.id,
            name: snapshot.record.name,
            date: snapshot.record.date,
            total_slots: snapshot.record.total_slots,
            available: snapshot.available,
            active_holds: snapshot.active_holds,
            confirmed: snapshot.confirmed,
            queue_len: snapshot.queue_len,
        }
    }
}

/// Messages the daemon sends to a client: direct replies plus the
/// real-time pushes routed through the broadcast hub
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    // Replies
    Hello { version: String },
    Ack { message: String },
    Error { message: String },
    Events { events: Vec<EventSummary> },
    Settings { settings: Settings },
    Status {
        uptime_secs: u64,
        online_sessions: usize,
        events: usize,
    },
    ShuttingDown,

    // Pushes
    QueueUpdate {
        event_id: EventId,
        queue: Vec<SessionId>,
        timers: BTreeMap<SessionId, u64>,
    },
    TimerUpdate {
        event_id: EventId,
        session_id: SessionId,
        seconds_remaining: u64,
    },
    EventUpdated { id: EventId, slots: u32 },
    ReservationConfirmed { event_id: EventId, user: SessionId },
    ReservationTimeout { event_id: EventId },
    OnlineUsers { count: usize },
    EventCreated { record: EventRecord },
    EventDeleted { id: EventId },
}

impl ServerMessage {
    /// True for hub pushes that can arrive interleaved with replies
    ///
    /// `Error` is deliberately not a push here: a client waiting on a
    /// reply must treat it as the answer to its request.
    pub fn is_push(&self) -> bool {
        matches!(
            self,
            ServerMessage::QueueUpdate { .. }
                | ServerMessage::TimerUpdate { .. }
                | ServerMessage::EventUpdated { .. }
                | ServerMessage::ReservationConfirmed { .. }
                | ServerMessage::ReservationTimeout { .. }
                | ServerMessage::OnlineUsers { .. }
                | ServerMessage::EventCreated { .. }
                | ServerMessage::EventDeleted { .. }
        )
    }
}

impl From<usher_core::Notice> for ServerMessage {
    fn from(notice: usher_core::Notice) -> Self {
        use usher_core::Notice;
        match notice {
            Notice::QueueUpdate {
                event_id,
                queue,
                timers,
            } => ServerMessage::QueueUpdate {
                event_id,
                queue,
                timers,
            },
            Notice::TimerUpdate {
                event_id,
                session_id,
                seconds_remaining,
            } => ServerMessage::TimerUpdate {
                event_id,
                session_id,
                seconds_remaining,
            },
            Notice::EventUpdated { id, slots } => ServerMessage::EventUpdated { id, slots },
            Notice::ReservationConfirmed { event_id, user } => {
                ServerMessage::ReservationConfirmed { event_id, user }
            }
            Notice::ReservationTimeout { event_id } => {
                ServerMessage::ReservationTimeout { event_id }
            }
            Notice::OnlineUsers { count } => ServerMessage::OnlineUsers { count },
            Notice::EventCreated { record } => ServerMessage::EventCreated { record },
            Notice::EventDeleted { id } => ServerMessage::EventDeleted { id },
            Notice::Error { message, .. } => ServerMessage::Error { message },
        }
    }
}

/// Encode a message as JSON (no length prefix)
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(value)?)
}

/// Decode a message from JSON bytes
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Write a length-prefixed frame
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    let len = u32::try_from(data.len()).map_err(|_| ProtocolError::FrameTooLarge(u32::MAX))?;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a length-prefixed frame; a clean EOF is `ConnectionClosed`
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut len_buf).await {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            return Err(ProtocolError::ConnectionClosed);
        }
        return Err(e.into());
    }

    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }

    let mut data = vec![0u8; len as usize];
    if let Err(e) = reader.read_exact(&mut data).await {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            return Err(ProtocolError::ConnectionClosed);
        }
        return Err(e.into());
    }
    Ok(data)
}

/// Write a server message as one frame
pub async fn write_server_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &ServerMessage,
) -> Result<(), ProtocolError> {
    let data = encode(message)?;
    write_message(writer, &data).await
}

/// Read one server message, without a deadline (used while watching)
pub async fn read_server_message<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<ServerMessage, ProtocolError> {
    let data = read_message(reader).await?;
    decode(&data)
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
