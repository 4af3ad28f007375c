// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal output helpers

use usher_core::Settings;
use usher_daemon::protocol::{EventSummary, ServerMessage};

pub fn print_events(events: &[EventSummary]) {
    if events.is_empty() {
        println!("No events");
        return;
    }

    println!(
        "{:<6} {:<24} {:<18} {:>6} {:>6} {:>6} {:>6}",
        "ID", "NAME", "DATE", "TOTAL", "FREE", "HELD", "QUEUE"
    );
    for event in events {
        println!(
            "{:<6} {:<24} {:<18} {:>6} {:>6} {:>6} {:>6}",
            event.id,
            truncate(&event.name, 24),
            event.date.format("%Y-%m-%d %H:%M"),
            event.total_slots,
            event.available,
            event.active_holds,
            event.queue_len,
        );
    }
}

pub fn print_settings(settings: &Settings) {
    println!("max_users: {}", settings.max_users);
    println!(
        "choice_timeout: {}",
        humantime::format_duration(settings.choice_timeout)
    );
    println!(
        "reservation_timeout: {}",
        humantime::format_duration(settings.reservation_timeout)
    );
}

/// One line per push, for watch mode
pub fn print_push(message: &ServerMessage) {
    match message {
        ServerMessage::QueueUpdate {
            event_id,
            queue,
            timers,
        } => println!(
            "queue_update     event {event_id}: {} waiting, {} holding",
            queue.len(),
            timers.len()
        ),
        ServerMessage::TimerUpdate {
            event_id,
            session_id,
            seconds_remaining,
        } => println!("timer_update     event {event_id}: {session_id} has {seconds_remaining}s"),
        ServerMessage::EventUpdated { id, slots } => {
            println!("event_updated    event {id}: {slots} slots available")
        }
        ServerMessage::ReservationConfirmed { event_id, user } => {
            println!("confirmed        event {event_id}: {user}")
        }
        ServerMessage::ReservationTimeout { event_id } => {
            println!("timeout          event {event_id}: a hold expired")
        }
        ServerMessage::OnlineUsers { count } => println!("online_users     {count} connected"),
        ServerMessage::EventCreated { record } => {
            println!("event_created    event {}: {}", record.id, record.name)
        }
        ServerMessage::EventDeleted { id } => println!("event_deleted    event {id}"),
        ServerMessage::Error { message } => println!("error            {message}"),
        _ => {}
    }
}

fn truncate(s: &str, max: usize) -> &str {
    s.char_indices().nth(max).map_or(s, |(i, _)| &s[..i])
}
