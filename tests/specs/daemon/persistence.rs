//! Persistence specs
//!
//! Event records, confirmed counts, and settings survive a restart;
//! live holds and queue entries deliberately do not.

use crate::prelude::*;
use usher_core::Settings;
use usher_daemon::protocol::{ClientMessage, ServerMessage};

#[tokio::test]
async fn confirmed_reservations_survive_a_restart() {
    let daemon = TestDaemon::spawn().await;
    let mut client = daemon.client().await;
    let event_id = create_event(&mut client, "launch", 5).await;

    let reply = client.request(ClientMessage::Reserve { event_id }).await;
    assert!(matches!(reply, ServerMessage::Ack { .. }));
    client
        .request(ClientMessage::BeginDetails { event_id })
        .await;
    let reply = client
        .request(ClientMessage::ConfirmReservation {
            event_id,
            name: "Ada".to_string(),
            phone: "555-0100".to_string(),
        })
        .await;
    assert!(matches!(reply, ServerMessage::Ack { .. }));

    drop(client);
    let dir = daemon.stop().await;
    let daemon = TestDaemon::spawn_in(dir).await;
    let mut client = daemon.client().await;

    let reply = client.request(ClientMessage::ListEvents).await;
    match reply {
        ServerMessage::Events { events } => {
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].id, event_id);
            assert_eq!(events[0].confirmed, 1);
            assert_eq!(events[0].available, 4);
        }
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn live_holds_do_not_survive_a_restart() {
    let daemon = TestDaemon::spawn().await;
    let mut client = daemon.client().await;
    let event_id = create_event(&mut client, "launch", 5).await;

    let reply = client.request(ClientMessage::Reserve { event_id }).await;
    assert!(matches!(reply, ServerMessage::Ack { .. }));

    drop(client);
    let dir = daemon.stop().await;
    let daemon = TestDaemon::spawn_in(dir).await;
    let mut client = daemon.client().await;

    let reply = client.request(ClientMessage::ListEvents).await;
    match reply {
        ServerMessage::Events { events } => {
            assert_eq!(events[0].active_holds, 0);
            assert_eq!(events[0].available, 5);
            assert_eq!(events[0].queue_len, 0);
        }
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn settings_survive_a_restart() {
    let daemon = TestDaemon::spawn().await;
    let mut client = daemon.client().await;

    let wanted = Settings {
        max_users: 7,
        ..Settings::default()
    };
    let reply = client
        .request(ClientMessage::UpdateSettings {
            settings: wanted.clone(),
        })
        .await;
    assert!(matches!(reply, ServerMessage::Ack { .. }));

    drop(client);
    let dir = daemon.stop().await;
    let daemon = TestDaemon::spawn_in(dir).await;
    let mut client = daemon.client().await;

    let reply = client.request(ClientMessage::GetSettings).await;
    assert_eq!(reply, ServerMessage::Settings { settings: wanted });
}

#[tokio::test]
async fn deleted_events_stay_deleted() {
    let daemon = TestDaemon::spawn().await;
    let mut client = daemon.client().await;
    let keep = create_event(&mut client, "keep", 5).await;
    let doomed = create_event(&mut client, "doomed", 5).await;

    let reply = client
        .request(ClientMessage::DeleteEvent { event_id: doomed })
        .await;
    assert!(matches!(reply, ServerMessage::Ack { .. }));

    drop(client);
    let dir = daemon.stop().await;
    let daemon = TestDaemon::spawn_in(dir).await;
    let mut client = daemon.client().await;

    let reply = client.request(ClientMessage::ListEvents).await;
    match reply {
        ServerMessage::Events { events } => {
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].id, keep);
        }
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn event_ids_keep_counting_after_a_restart() {
    let daemon = TestDaemon::spawn().await;
    let mut client = daemon.client().await;
    let first = create_event(&mut client, "first", 5).await;

    drop(client);
    let dir = daemon.stop().await;
    let daemon = TestDaemon::spawn_in(dir).await;
    let mut client = daemon.client().await;

    let second = create_event(&mut client, "second", 5).await;
    assert!(second > first, "ids must not be reused: {first} vs {second}");
}
