// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket server and connection handling.
//!
//! One connection is one session. A writer task drains the session's
//! hub channel onto the socket; the read loop dispatches client
//! messages to the coordinator and queues replies through the same
//! channel, so replies and pushes stay ordered.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tokio::net::UnixStream;
use tokio::sync::Notify;
use tracing::{debug, error, warn};
use usher_core::{
    Coordinator, GuestDetails, IdGen, ReserveOutcome, SessionId, Settings, SystemClock, UuidIdGen,
};
use usher_storage::{Catalog, StoredEvent};

use crate::hub::BroadcastHub;
use crate::protocol::{self, ClientMessage, ProtocolError, ServerMessage, PROTOCOL_VERSION};

/// Shared state behind every connection task
pub struct ServerContext {
    pub coordinator: Coordinator<SystemClock, BroadcastHub>,
    pub hub: BroadcastHub,
    catalog: Mutex<Catalog>,
    ids: UuidIdGen,
    pub start_time: Instant,
    /// Signalled when a client asks the daemon to stop
    pub shutdown: Notify,
}

impl ServerContext {
    pub fn new(
        coordinator: Coordinator<SystemClock, BroadcastHub>,
        hub: BroadcastHub,
        catalog: Catalog,
    ) -> Self {
        Self {
            coordinator,
            hub,
            catalog: Mutex::new(catalog),
            ids: UuidIdGen,
            start_time: Instant::now(),
            shutdown: Notify::new(),
        }
    }

    fn lock_catalog(&self) -> MutexGuard<'_, Catalog> {
        self.catalog.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Handle a single client connection for its whole lifetime
pub async fn handle_connection(ctx: Arc<ServerContext>, stream: UnixStream) {
    let session_id = SessionId(ctx.ids.next());
    let mut rx = ctx.hub.register(session_id.clone());
    ctx.coordinator.on_connect(session_id.clone());

    let (mut reader, mut writer) = stream.into_split();

    let writer_session = session_id.clone();
    let writer_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = protocol::write_server_message(&mut writer, &message).await {
                debug!(session = %writer_session, "write failed: {e}");
                break;
            }
        }
    });

    loop {
        let bytes = match protocol::read_message(&mut reader).await {
            Ok(bytes) => bytes,
            Err(ProtocolError::ConnectionClosed) => break,
            Err(e) => {
                debug!(session = %session_id, "read failed: {e}");
                break;
            }
        };

        let message: ClientMessage = match protocol::decode(&bytes) {
            Ok(message) => message,
            Err(e) => {
                ctx.hub.send_to(
                    &session_id,
                    ServerMessage::Error {
                        message: format!("malformed message: {e}"),
                    },
                );
                continue;
            }
        };

        debug!(session = %session_id, ?message, "received");
        let stop = matches!(message, ClientMessage::Shutdown);
        let reply = dispatch(&ctx, &session_id, message);
        ctx.hub.send_to(&session_id, reply);

        if stop {
            ctx.shutdown.notify_waiters();
            break;
        }
    }

    ctx.coordinator.on_disconnect(&session_id);
    ctx.hub.deregister(&session_id);
    if let Err(e) = writer_task.await {
        error!(session = %session_id, "writer task failed: {e}");
    }
}

/// Handle one client message and produce the direct reply
fn dispatch(ctx: &ServerContext, session_id: &SessionId, message: ClientMessage) -> ServerMessage {
    match message {
        ClientMessage::Hello { version: _ } => ServerMessage::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        ClientMessage::Watch { event_id } => match ctx.coordinator.event_snapshot(event_id) {
            Some(snapshot) => {
                ctx.hub.watch(session_id, event_id);
                // Prime the new watcher with the current availability
                ctx.hub.send_to(
                    session_id,
                    ServerMessage::EventUpdated {
                        id: event_id,
                        slots: snapshot.available,
                    },
                );
                ServerMessage::Ack {
                    message: format!("watching event {event_id}"),
                }
            }
            None => ServerMessage::Error {
                message: format!("event {event_id} not found"),
            },
        },

        ClientMessage::Unwatch { event_id } => {
            ctx.hub.unwatch(session_id, event_id);
            ServerMessage::Ack {
                message: format!("stopped watching event {event_id}"),
            }
        }

        ClientMessage::Reserve { event_id } => {
            match ctx.coordinator.reserve(session_id, event_id) {
                Ok(ReserveOutcome::HoldGranted { seconds_remaining }) => ServerMessage::Ack {
                    message: format!("hold granted, {seconds_remaining}s to continue"),
                },
                Ok(ReserveOutcome::Queued { position }) => ServerMessage::Ack {
                    // Zero-based internally, one-based for humans
                    message: format!("queued at position {}", position + 1),
                },
                Err(e) => ServerMessage::Error {
                    message: e.to_string(),
                },
            }
        }

        ClientMessage::BeginDetails { event_id } => {
            match ctx.coordinator.begin_details(session_id, event_id) {
                Ok(()) => ServerMessage::Ack {
                    message: "details phase started".to_string(),
                },
                Err(e) => ServerMessage::Error {
                    message: e.to_string(),
                },
            }
        }

        ClientMessage::ConfirmReservation {
            event_id,
            name,
            phone,
        } => match ctx
            .coordinator
            .confirm(session_id, event_id, GuestDetails { name, phone })
        {
            Ok(()) => {
                persist_events(ctx);
                ServerMessage::Ack {
                    message: format!("reservation confirmed for event {event_id}"),
                }
            }
            Err(e) => ServerMessage::Error {
                message: e.to_string(),
            },
        },

        ClientMessage::CancelReservation { event_id } => {
            match ctx.coordinator.cancel(session_id, event_id) {
                Ok(()) => ServerMessage::Ack {
                    message: "reservation cancelled".to_string(),
                },
                Err(e) => ServerMessage::Error {
                    message: e.to_string(),
                },
            }
        }

        ClientMessage::ListEvents => ServerMessage::Events {
            events: ctx
                .coordinator
                .list_events()
                .into_iter()
                .map(Into::into)
                .collect(),
        },

        ClientMessage::CreateEvent { name, slots, date } => {
            match ctx.coordinator.create_event(name, slots, date) {
                Ok(record) => {
                    persist_events(ctx);
                    ServerMessage::Ack {
                        message: format!("created event {}", record.id),
                    }
                }
                Err(e) => ServerMessage::Error {
                    message: e.to_string(),
                },
            }
        }

        ClientMessage::DeleteEvent { event_id } => match ctx.coordinator.delete_event(event_id) {
            Ok(()) => {
                persist_events(ctx);
                ServerMessage::Ack {
                    message: format!("deleted event {event_id}"),
                }
            }
            Err(e) => ServerMessage::Error {
                message: e.to_string(),
            },
        },

        ClientMessage::GetSettings => ServerMessage::Settings {
            settings: ctx.coordinator.settings(),
        },

        ClientMessage::UpdateSettings { settings } => {
            match ctx.coordinator.update_settings(settings.clone()) {
                Ok(()) => {
                    persist_settings(ctx, &settings);
                    ServerMessage::Ack {
                        message: "settings updated".to_string(),
                    }
                }
                Err(e) => ServerMessage::Error {
                    message: e.to_string(),
                },
            }
        }

        ClientMessage::Status => ServerMessage::Status {
            uptime_secs: ctx.start_time.elapsed().as_secs(),
            online_sessions: ctx.coordinator.online_count(),
            events: ctx.coordinator.list_events().len(),
        },

        ClientMessage::Shutdown => ServerMessage::ShuttingDown,
    }
}

/// Snapshot durable event state to disk; failures are logged, not fatal
fn persist_events(ctx: &ServerContext) {
    let stored: Vec<StoredEvent> = ctx
        .coordinator
        .list_events()
        .into_iter()
        .map(|snapshot| StoredEvent {
            record: snapshot.record,
            confirmed: snapshot.confirmed,
        })
        .collect();
    if let Err(e) = ctx.lock_catalog().save_events(&stored) {
        warn!("failed to persist events: {e}");
    }
}

fn persist_settings(ctx: &ServerContext, settings: &Settings) {
    if let Err(e) = ctx.lock_catalog().save_settings(settings) {
        warn!("failed to persist settings: {e}");
    }
}
