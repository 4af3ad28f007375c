//! Admission specs over the wire protocol
//!
//! Hold grants, queueing, promotion, confirmation, and the pushes
//! watching sessions observe.

use std::time::Duration;

use crate::prelude::*;
use usher_core::Settings;
use usher_daemon::protocol::{ClientMessage, ServerMessage};

/// Settings with a hold cap of one, so a second session queues
fn cap_one() -> Settings {
    Settings {
        max_users: 1,
        ..Settings::default()
    }
}

#[tokio::test]
async fn reserve_grants_a_hold_within_the_cap() {
    let daemon = TestDaemon::spawn().await;
    let mut client = daemon.client().await;
    let event_id = create_event(&mut client, "launch", 5).await;

    let reply = client.request(ClientMessage::Reserve { event_id }).await;

    match reply {
        ServerMessage::Ack { message } => assert!(message.contains("hold granted")),
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn second_session_queues_when_cap_reached() {
    let daemon = TestDaemon::spawn().await;
    let mut admin = daemon.client().await;
    let reply = admin
        .request(ClientMessage::UpdateSettings {
            settings: cap_one(),
        })
        .await;
    assert!(matches!(reply, ServerMessage::Ack { .. }));
    let event_id = create_event(&mut admin, "launch", 5).await;

    let mut first = daemon.client().await;
    let reply = first.request(ClientMessage::Reserve { event_id }).await;
    assert!(matches!(reply, ServerMessage::Ack { .. }));

    let mut second = daemon.client().await;
    let reply = second.request(ClientMessage::Reserve { event_id }).await;
    match reply {
        ServerMessage::Ack { message } => assert!(message.contains("queued at position 1")),
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn sold_out_event_rejects_instead_of_queueing() {
    let daemon = TestDaemon::spawn().await;
    let mut client = daemon.client().await;
    let event_id = create_event(&mut client, "tiny", 1).await;

    // Take the only slot
    let reply = client.request(ClientMessage::Reserve { event_id }).await;
    assert!(matches!(reply, ServerMessage::Ack { .. }));
    let reply = client
        .request(ClientMessage::BeginDetails { event_id })
        .await;
    assert!(matches!(reply, ServerMessage::Ack { .. }));
    let reply = client
        .request(ClientMessage::ConfirmReservation {
            event_id,
            name: "Ada".to_string(),
            phone: "555-0100".to_string(),
        })
        .await;
    assert!(matches!(reply, ServerMessage::Ack { .. }));

    // No capacity left and no full set of holders to wait behind
    let reply = client.request(ClientMessage::Reserve { event_id }).await;
    match reply {
        ServerMessage::Error { message } => assert!(message.contains("no slots available")),
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn confirm_broadcasts_to_watchers_and_consumes_a_slot() {
    let daemon = TestDaemon::spawn().await;
    let mut client = daemon.client().await;
    let event_id = create_event(&mut client, "launch", 5).await;

    let reply = client.request(ClientMessage::Watch { event_id }).await;
    assert!(matches!(reply, ServerMessage::Ack { .. }));
    let reply = client.request(ClientMessage::Reserve { event_id }).await;
    assert!(matches!(reply, ServerMessage::Ack { .. }));
    let reply = client
        .request(ClientMessage::BeginDetails { event_id })
        .await;
    assert!(matches!(reply, ServerMessage::Ack { .. }));

    client
        .send(&ClientMessage::ConfirmReservation {
            event_id,
            name: "Ada".to_string(),
            phone: "555-0100".to_string(),
        })
        .await;

    client
        .expect_message(|m| matches!(m, ServerMessage::ReservationConfirmed { .. }))
        .await;
    let update = client
        .expect_message(|m| matches!(m, ServerMessage::EventUpdated { .. }))
        .await;
    assert_eq!(
        update,
        ServerMessage::EventUpdated {
            id: usher_core::EventId(event_id.0),
            slots: 4,
        }
    );
}

#[tokio::test]
async fn cancel_promotes_the_queue_head() {
    let daemon = TestDaemon::spawn().await;
    let mut admin = daemon.client().await;
    admin
        .request(ClientMessage::UpdateSettings {
            settings: cap_one(),
        })
        .await;
    let event_id = create_event(&mut admin, "launch", 5).await;

    let mut holder = daemon.client().await;
    let reply = holder.request(ClientMessage::Reserve { event_id }).await;
    assert!(matches!(reply, ServerMessage::Ack { .. }));

    let mut waiter = daemon.client().await;
    let reply = waiter.request(ClientMessage::Watch { event_id }).await;
    assert!(matches!(reply, ServerMessage::Ack { .. }));
    let reply = waiter.request(ClientMessage::Reserve { event_id }).await;
    assert!(matches!(reply, ServerMessage::Ack { .. }));

    let reply = holder
        .request(ClientMessage::CancelReservation { event_id })
        .await;
    assert!(matches!(reply, ServerMessage::Ack { .. }));

    // The waiter is promoted: line empty, one live hold countdown
    waiter
        .expect_message(|m| {
            matches!(
                m,
                ServerMessage::QueueUpdate { queue, timers, .. }
                    if queue.is_empty() && timers.len() == 1
            )
        })
        .await;

    // And the promoted hold is real: the details phase opens
    let reply = waiter
        .request(ClientMessage::BeginDetails { event_id })
        .await;
    assert!(matches!(reply, ServerMessage::Ack { .. }));
}

#[tokio::test]
async fn disconnect_releases_the_hold_and_moves_the_line() {
    let daemon = TestDaemon::spawn().await;
    let mut admin = daemon.client().await;
    admin
        .request(ClientMessage::UpdateSettings {
            settings: cap_one(),
        })
        .await;
    let event_id = create_event(&mut admin, "launch", 5).await;

    let holder = {
        let mut holder = daemon.client().await;
        let reply = holder.request(ClientMessage::Reserve { event_id }).await;
        assert!(matches!(reply, ServerMessage::Ack { .. }));
        holder
    };

    let mut waiter = daemon.client().await;
    waiter.request(ClientMessage::Watch { event_id }).await;
    let reply = waiter.request(ClientMessage::Reserve { event_id }).await;
    assert!(matches!(reply, ServerMessage::Ack { .. }));

    // Holder's connection drops; their hold is an implicit cancel
    drop(holder);

    waiter
        .expect_message(|m| {
            matches!(
                m,
                ServerMessage::QueueUpdate { queue, timers, .. }
                    if queue.is_empty() && timers.len() == 1
            )
        })
        .await;
    let reply = waiter
        .request(ClientMessage::BeginDetails { event_id })
        .await;
    assert!(matches!(reply, ServerMessage::Ack { .. }));
}

#[tokio::test]
async fn online_count_is_broadcast_on_connect_and_disconnect() {
    let daemon = TestDaemon::spawn().await;

    let mut first = daemon.client().await;
    let push = first
        .expect_message(|m| matches!(m, ServerMessage::OnlineUsers { .. }))
        .await;
    assert_eq!(push, ServerMessage::OnlineUsers { count: 1 });

    let second = daemon.client().await;
    let push = first
        .expect_message(|m| matches!(m, ServerMessage::OnlineUsers { .. }))
        .await;
    assert_eq!(push, ServerMessage::OnlineUsers { count: 2 });

    drop(second);
    let push = first
        .expect_message(|m| matches!(m, ServerMessage::OnlineUsers { .. }))
        .await;
    assert_eq!(push, ServerMessage::OnlineUsers { count: 1 });
}

#[tokio::test]
async fn hold_expiry_fires_on_the_heartbeat() {
    let daemon = TestDaemon::spawn().await;
    let mut admin = daemon.client().await;
    let reply = admin
        .request(ClientMessage::UpdateSettings {
            settings: Settings {
                max_users: 1,
                choice_timeout: Duration::from_millis(50),
                ..Settings::default()
            },
        })
        .await;
    assert!(matches!(reply, ServerMessage::Ack { .. }));
    let event_id = create_event(&mut admin, "launch", 5).await;

    let mut holder = daemon.client().await;
    holder.request(ClientMessage::Watch { event_id }).await;
    let reply = holder.request(ClientMessage::Reserve { event_id }).await;
    assert!(matches!(reply, ServerMessage::Ack { .. }));

    // Drive the scheduler the way the daemon's heartbeat loop does
    tokio::time::sleep(Duration::from_millis(100)).await;
    daemon.ctx.coordinator.tick();

    holder
        .expect_message(|m| matches!(m, ServerMessage::ReservationTimeout { .. }))
        .await;

    // The expired session no longer holds anything
    let reply = holder
        .request(ClientMessage::BeginDetails { event_id })
        .await;
    assert!(matches!(reply, ServerMessage::Error { .. }));
}
