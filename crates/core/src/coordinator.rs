// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reservation coordinator: the per-event admission gate
//!
//! All mutating operations on one event's state (ledger, queue, holds)
//! run under that event's mutex; operations on different events do not
//! contend. The connection registry has its own short-lived lock and is
//! only ever taken while already inside an event section (or alone),
//! never the other way around. Deadline callbacks re-enter through
//! [`Coordinator::handle_deadline`], acquire the same event lock, and
//! no-op when the hold has already been resolved — an expiry racing a
//! confirm cannot both win.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::event::{EventId, EventRecord};
use crate::hold::Hold;
use crate::ledger::{
    AcquireOutcome, BeginDetailsOutcome, ConfirmOutcome, ReleaseOutcome, SlotLedger,
};
use crate::notice::{Notice, Publisher};
use crate::queue::{AdmissionQueue, EnqueueOutcome};
use crate::registry::{ConnectionRegistry, Ownership, SessionId};
use crate::scheduler::{Deadline, DeadlineKind, Scheduler};
use crate::settings::{Settings, SettingsError};

/// Contact details supplied with a confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestDetails {
    pub name: String,
    pub phone: String,
}

/// Live state for one event
#[derive(Debug)]
pub struct EventState {
    pub record: EventRecord,
    pub ledger: SlotLedger,
    pub queue: AdmissionQueue,
    /// Confirmed guests, in confirmation order (in-memory only)
    pub guests: Vec<(SessionId, GuestDetails)>,
}

impl EventState {
    fn new(record: EventRecord, confirmed: u32) -> Self {
        let mut ledger = SlotLedger::new(record.total_slots);
        for _ in 0..confirmed {
            ledger.restore_confirmed();
        }
        Self {
            record,
            ledger,
            queue: AdmissionQueue::new(),
            guests: Vec::new(),
        }
    }
}

/// Read-only view of an event for listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSnapshot {
    pub record: EventRecord,
    pub available: u32,
    pub active_holds: u32,
    pub confirmed: u32,
    pub queue_len: usize,
}

/// Result of a successful reserve call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// Hold granted; the choice-phase countdown is running
    HoldGranted { seconds_remaining: u64 },
    /// Hold cap reached; the session joined the wait line
    Queued { position: usize },
}

/// Locally recovered operation rejections
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("event {0} not found")]
    UnknownEvent(EventId),

    #[error("event {0} has no slots available")]
    NoCapacity(EventId),

    #[error("session already holds a reservation in progress")]
    AlreadyHeld,

    #[error("session is already in the queue")]
    AlreadyQueued,

    #[error("no active hold for this session")]
    NotHeld,

    #[error("begin details before confirming")]
    NotAwaitingDetails,

    #[error("details already begun for this hold")]
    DetailsAlreadyBegun,

    #[error("event needs a name and at least one slot")]
    InvalidEvent,

    #[error(transparent)]
    InvalidSettings(#[from] SettingsError),
}

/// Orchestrates ledgers, queues, hold deadlines, and broadcasts
pub struct Coordinator<C: Clock, P: Publisher> {
    clock: C,
    publisher: Arc<P>,
    scheduler: Arc<Mutex<Scheduler>>,
    settings: RwLock<Settings>,
    registry: Mutex<ConnectionRegistry>,
    events: RwLock<HashMap<EventId, Arc<Mutex<EventState>>>>,
    next_event_id: AtomicU64,
}

impl<C: Clock, P: Publisher> Coordinator<C, P> {
    pub fn new(clock: C, publisher: Arc<P>, settings: Settings) -> Self {
        Self {
            clock,
            publisher,
            scheduler: Arc::new(Mutex::new(Scheduler::new())),
            settings: RwLock::new(settings),
            registry: Mutex::new(ConnectionRegistry::new()),
            events: RwLock::new(HashMap::new()),
            next_event_id: AtomicU64::new(1),
        }
    }

    // === Connections ===

    pub fn on_connect(&self, session_id: SessionId) {
        let count = {
            let mut registry = self.lock_registry();
            registry.on_connect(session_id.clone());
            registry.online_count()
        };
        debug!(session = %session_id, online = count, "session connected");
        self.publisher.publish(Notice::OnlineUsers { count });
    }

    /// Implicit cancellation of whatever the session was doing
    pub fn on_disconnect(&self, session_id: &SessionId) {
        let (owned, count) = {
            let mut registry = self.lock_registry();
            let owned = registry.on_disconnect(session_id);
            (owned, registry.online_count())
        };

        match owned {
            Some(Ownership::Holding(event_id)) => {
                if let Some(event) = self.event_arc(event_id) {
                    let mut state = lock_state(&event);
                    self.release_hold_locked(&mut state, session_id, ReleaseCause::Disconnect);
                }
            }
            Some(Ownership::Queued(event_id)) => {
                if let Some(event) = self.event_arc(event_id) {
                    let mut state = lock_state(&event);
                    if state.queue.remove(session_id) {
                        self.publish_queue_update(&state);
                    }
                }
            }
            Some(Ownership::Idle) | None => {}
        }

        debug!(session = %session_id, online = count, "session disconnected");
        self.publisher.publish(Notice::OnlineUsers { count });
    }

    pub fn online_count(&self) -> usize {
        self.lock_registry().online_count()
    }

    // === Reservation operations ===

    /// Ask for a hold slot; queue when the hold cap is reached
    pub fn reserve(
        &self,
        session_id: &SessionId,
        event_id: EventId,
    ) -> Result<ReserveOutcome, CoordinatorError> {
        let event = self
            .event_arc(event_id)
            .ok_or(CoordinatorError::UnknownEvent(event_id))?;
        let mut state = lock_state(&event);
        let settings = self.settings();
        let now = self.clock.now();

        let mut registry = self.lock_registry();
        match registry.ownership(session_id) {
            Ownership::Holding(_) => return Err(CoordinatorError::AlreadyHeld),
            Ownership::Queued(_) => return Err(CoordinatorError::AlreadyQueued),
            Ownership::Idle => {}
        }

        match state.ledger.try_acquire(
            event_id,
            session_id.clone(),
            settings.max_users,
            now,
            settings.choice_timeout,
        ) {
            AcquireOutcome::Granted(hold) => {
                registry.set_ownership(session_id, Ownership::Holding(event_id));
                drop(registry);
                self.schedule_expiry(&hold);
                info!(session = %session_id, event = %event_id, "hold granted");
                self.publish_event_updated(&state);
                self.publish_queue_update(&state);
                Ok(ReserveOutcome::HoldGranted {
                    seconds_remaining: hold.seconds_remaining(now),
                })
            }
            AcquireOutcome::NoCapacity => {
                // Queue only behind a full set of holders; a sold-out or
                // momentarily unservable event is a plain rejection.
                if state.ledger.active_holds() >= settings.max_users
                    && !state.ledger.fully_confirmed()
                {
                    let position = match state.queue.enqueue(session_id.clone(), now) {
                        EnqueueOutcome::Enqueued { position } => position,
                        EnqueueOutcome::AlreadyQueued => {
                            return Err(CoordinatorError::AlreadyQueued)
                        }
                    };
                    registry.set_ownership(session_id, Ownership::Queued(event_id));
                    drop(registry);
                    info!(session = %session_id, event = %event_id, position, "session queued");
                    self.publish_queue_update(&state);
                    Ok(ReserveOutcome::Queued { position })
                } else {
                    Err(CoordinatorError::NoCapacity(event_id))
                }
            }
            AcquireOutcome::AlreadyHeld => Err(CoordinatorError::AlreadyHeld),
        }
    }

    /// The session's explicit continue action: Choosing -> AwaitingDetails
    pub fn begin_details(
        &self,
        session_id: &SessionId,
        event_id: EventId,
    ) -> Result<(), CoordinatorError> {
        let event = self
            .event_arc(event_id)
            .ok_or(CoordinatorError::UnknownEvent(event_id))?;
        let mut state = lock_state(&event);
        let settings = self.settings();
        let now = self.clock.now();

        match state
            .ledger
            .begin_details(session_id, now, settings.reservation_timeout)
        {
            BeginDetailsOutcome::Moved(hold) => {
                self.schedule_expiry(&hold);
                debug!(session = %session_id, event = %event_id, "details phase started");
                self.publish_queue_update(&state);
                Ok(())
            }
            BeginDetailsOutcome::NotChoosing => Err(CoordinatorError::DetailsAlreadyBegun),
            BeginDetailsOutcome::NotHeld => Err(CoordinatorError::NotHeld),
        }
    }

    /// Commit the slot; valid only while AwaitingDetails
    pub fn confirm(
        &self,
        session_id: &SessionId,
        event_id: EventId,
        details: GuestDetails,
    ) -> Result<(), CoordinatorError> {
        let event = self
            .event_arc(event_id)
            .ok_or(CoordinatorError::UnknownEvent(event_id))?;
        let mut state = lock_state(&event);

        match state.ledger.confirm(session_id) {
            ConfirmOutcome::Confirmed => {
                self.cancel_expiry(event_id, session_id);
                self.lock_registry()
                    .set_ownership(session_id, Ownership::Idle);
                state.guests.push((session_id.clone(), details));
                info!(session = %session_id, event = %event_id, "reservation confirmed");

                self.publisher.publish(Notice::ReservationConfirmed {
                    event_id,
                    user: session_id.clone(),
                });
                self.publish_event_updated(&state);
                // Confirm frees a hold-cap spot; the line moves inside
                // this same critical section.
                self.promote_locked(&mut state);
                self.publish_queue_update(&state);
                Ok(())
            }
            ConfirmOutcome::NotAwaitingDetails => Err(CoordinatorError::NotAwaitingDetails),
            ConfirmOutcome::NotHeld => Err(CoordinatorError::NotHeld),
        }
    }

    /// Explicit cancellation of a hold or queue spot
    pub fn cancel(
        &self,
        session_id: &SessionId,
        event_id: EventId,
    ) -> Result<(), CoordinatorError> {
        let event = self
            .event_arc(event_id)
            .ok_or(CoordinatorError::UnknownEvent(event_id))?;
        let mut state = lock_state(&event);

        if self.release_hold_locked(&mut state, session_id, ReleaseCause::Cancelled) {
            return Ok(());
        }
        if state.queue.remove(session_id) {
            self.lock_registry()
                .set_ownership(session_id, Ownership::Idle);
            info!(session = %session_id, event = %event_id, "left the queue");
            self.publish_queue_update(&state);
            return Ok(());
        }
        Err(CoordinatorError::NotHeld)
    }

    // === Timers ===

    /// Poll deadlines and push countdown updates; called from the
    /// daemon's heartbeat loop (once per second)
    pub fn tick(&self) {
        let fired = {
            let mut scheduler = self.lock_scheduler();
            scheduler.poll(self.clock.now())
        };
        for deadline in fired {
            self.handle_deadline(deadline);
        }
        self.push_countdowns();
    }

    /// A hold's phase deadline fired
    pub fn handle_deadline(&self, deadline: Deadline) {
        let DeadlineKind::HoldExpiry {
            event_id,
            session_id,
        } = deadline.kind;

        let Some(event) = self.event_arc(event_id) else {
            return;
        };
        let mut state = lock_state(&event);

        // The deadline may have lost a race with a confirm, cancel, or
        // phase change that re-armed the timer; only a hold still past
        // due gets expired.
        let now = self.clock.now();
        let past_due = state
            .ledger
            .hold_for(&session_id)
            .is_some_and(|hold| hold.expires_at <= now);
        if !past_due {
            return;
        }

        self.release_hold_locked(&mut state, &session_id, ReleaseCause::Expired);
    }

    /// Push one timer_update per live hold with server-computed seconds
    pub fn push_countdowns(&self) {
        let now = self.clock.now();
        for event in self.all_event_arcs() {
            let state = lock_state(&event);
            for hold in state.ledger.holds() {
                self.publisher.publish(Notice::TimerUpdate {
                    event_id: state.record.id,
                    session_id: hold.session_id.clone(),
                    seconds_remaining: hold.seconds_remaining(now),
                });
            }
        }
    }

    // === Event administration ===

    pub fn create_event(
        &self,
        name: impl Into<String>,
        total_slots: u32,
        date: DateTime<Utc>,
    ) -> Result<EventRecord, CoordinatorError> {
        let name = name.into();
        if name.trim().is_empty() || total_slots == 0 {
            return Err(CoordinatorError::InvalidEvent);
        }

        let id = EventId(self.next_event_id.fetch_add(1, Ordering::SeqCst));
        let record = EventRecord {
            id,
            name,
            total_slots,
            date,
        };
        self.lock_events_mut()
            .insert(id, Arc::new(Mutex::new(EventState::new(record.clone(), 0))));
        info!(event = %id, slots = total_slots, "event created");
        self.publisher.publish(Notice::EventCreated {
            record: record.clone(),
        });
        Ok(record)
    }

    /// Seed an event at startup (from the persisted catalog)
    pub fn load_event(&self, record: EventRecord, confirmed: u32) {
        let id = record.id;
        self.next_event_id.fetch_max(id.0 + 1, Ordering::SeqCst);
        self.lock_events_mut()
            .insert(id, Arc::new(Mutex::new(EventState::new(record, confirmed))));
    }

    /// Delete an event, clearing every live hold and queue entry for it
    pub fn delete_event(&self, event_id: EventId) -> Result<(), CoordinatorError> {
        let event = self
            .lock_events_mut()
            .remove(&event_id)
            .ok_or(CoordinatorError::UnknownEvent(event_id))?;
        let mut state = lock_state(&event);

        let mut registry = self.lock_registry();
        for hold in state.ledger.drain_holds() {
            self.cancel_expiry(event_id, &hold.session_id);
            registry.set_ownership(&hold.session_id, Ownership::Idle);
        }
        for entry in state.queue.drain() {
            registry.set_ownership(&entry.session_id, Ownership::Idle);
        }
        drop(registry);

        info!(event = %event_id, "event deleted");
        self.publisher.publish(Notice::EventDeleted { id: event_id });
        Ok(())
    }

    pub fn list_events(&self) -> Vec<EventSnapshot> {
        let mut snapshots: Vec<_> = self
            .all_event_arcs()
            .into_iter()
            .map(|event| {
                let state = lock_state(&event);
                EventSnapshot {
                    record: state.record.clone(),
                    available: state.ledger.available(),
                    active_holds: state.ledger.active_holds(),
                    confirmed: state.ledger.confirmed(),
                    queue_len: state.queue.len(),
                }
            })
            .collect();
        snapshots.sort_by_key(|s| s.record.id);
        snapshots
    }

    pub fn event_snapshot(&self, event_id: EventId) -> Option<EventSnapshot> {
        let event = self.event_arc(event_id)?;
        let state = lock_state(&event);
        Some(EventSnapshot {
            record: state.record.clone(),
            available: state.ledger.available(),
            active_holds: state.ledger.active_holds(),
            confirmed: state.ledger.confirmed(),
            queue_len: state.queue.len(),
        })
    }

    // === Settings ===

    pub fn settings(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Apply new settings; existing countdowns keep their deadlines
    pub fn update_settings(&self, new: Settings) -> Result<(), CoordinatorError> {
        new.validate()?;
        let mut settings = self.settings.write().unwrap_or_else(|e| e.into_inner());
        info!(
            max_users = new.max_users,
            "settings updated"
        );
        *settings = new;
        Ok(())
    }

    // === Internals ===

    /// Release a session's hold and move the line, all under the event
    /// lock. Returns false when the session held nothing here.
    fn release_hold_locked(
        &self,
        state: &mut MutexGuard<'_, EventState>,
        session_id: &SessionId,
        cause: ReleaseCause,
    ) -> bool {
        let ReleaseOutcome::Released(_) = state.ledger.release(session_id) else {
            return false;
        };
        let event_id = state.record.id;
        self.cancel_expiry(event_id, session_id);
        self.lock_registry()
            .set_ownership(session_id, Ownership::Idle);
        info!(session = %session_id, event = %event_id, ?cause, "hold released");

        if cause == ReleaseCause::Expired {
            self.publisher
                .publish(Notice::ReservationTimeout { event_id });
        }
        self.publish_event_updated(state);
        self.promote_locked(state);
        self.publish_queue_update(state);
        true
    }

    /// Grant holds to the front of the line while capacity allows.
    ///
    /// Runs inside the critical section that freed capacity, so there
    /// is no window where a hold slot sits free with a non-empty queue.
    fn promote_locked(&self, state: &mut MutexGuard<'_, EventState>) {
        let settings = self.settings();
        let event_id = state.record.id;

        if state.ledger.fully_confirmed() {
            self.drain_unservable_locked(state);
            return;
        }

        while state.ledger.active_holds() < settings.max_users
            && state.ledger.available() > 0
            && !state.queue.is_empty()
        {
            let Some(entry) = state.queue.dequeue_front() else {
                break;
            };
            let now = self.clock.now();
            match state.ledger.try_acquire(
                event_id,
                entry.session_id.clone(),
                settings.max_users,
                now,
                settings.choice_timeout,
            ) {
                AcquireOutcome::Granted(hold) => {
                    self.lock_registry()
                        .set_ownership(&entry.session_id, Ownership::Holding(event_id));
                    self.schedule_expiry(&hold);
                    info!(session = %entry.session_id, event = %event_id, "promoted from queue");
                    self.publish_event_updated(state);
                }
                AcquireOutcome::NoCapacity | AcquireOutcome::AlreadyHeld => break,
            }
        }
    }

    /// A fully confirmed event can never serve its queue; clear it out
    /// and tell each session why.
    fn drain_unservable_locked(&self, state: &mut MutexGuard<'_, EventState>) {
        if state.queue.is_empty() {
            return;
        }
        let mut registry = self.lock_registry();
        for entry in state.queue.drain() {
            registry.set_ownership(&entry.session_id, Ownership::Idle);
            self.publisher.publish(Notice::Error {
                session_id: entry.session_id,
                message: format!("event {} is sold out", state.record.id),
            });
        }
    }

    fn schedule_expiry(&self, hold: &Hold) {
        self.lock_scheduler().schedule(
            Hold::timer_id(hold.event_id, &hold.session_id),
            hold.expires_at,
            DeadlineKind::HoldExpiry {
                event_id: hold.event_id,
                session_id: hold.session_id.clone(),
            },
        );
    }

    fn cancel_expiry(&self, event_id: EventId, session_id: &SessionId) {
        self.lock_scheduler()
            .cancel(&Hold::timer_id(event_id, session_id));
    }

    fn publish_event_updated(&self, state: &EventState) {
        self.publisher.publish(Notice::EventUpdated {
            id: state.record.id,
            slots: state.ledger.available(),
        });
    }

    fn publish_queue_update(&self, state: &EventState) {
        let now = self.clock.now();
        let timers = state
            .ledger
            .holds()
            .map(|hold| (hold.session_id.clone(), hold.seconds_remaining(now)))
            .collect();
        self.publisher.publish(Notice::QueueUpdate {
            event_id: state.record.id,
            queue: state.queue.snapshot(),
            timers,
        });
    }

    fn event_arc(&self, event_id: EventId) -> Option<Arc<Mutex<EventState>>> {
        self.events
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&event_id)
            .cloned()
    }

    fn all_event_arcs(&self) -> Vec<Arc<Mutex<EventState>>> {
        self.events
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }

    fn lock_events_mut(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<EventId, Arc<Mutex<EventState>>>> {
        self.events.write().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_registry(&self) -> MutexGuard<'_, ConnectionRegistry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_scheduler(&self) -> MutexGuard<'_, Scheduler> {
        self.scheduler.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Why a hold was released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReleaseCause {
    Cancelled,
    Expired,
    Disconnect,
}

fn lock_state(event: &Arc<Mutex<EventState>>) -> MutexGuard<'_, EventState> {
    event.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
