//! Daemon lifecycle specs
//!
//! Startup artifacts, single-instance locking, handshake, shutdown.

use crate::prelude::*;
use usher_daemon::lifecycle;
use usher_daemon::protocol::{ClientMessage, ServerMessage, PROTOCOL_VERSION};

#[tokio::test]
async fn startup_creates_socket_and_pid_file() {
    let daemon = TestDaemon::spawn().await;

    assert!(daemon.config.socket_path.exists());
    let pid = std::fs::read_to_string(&daemon.config.lock_path).expect("pid file");
    assert_eq!(pid.trim(), std::process::id().to_string());
}

#[tokio::test]
async fn second_daemon_on_same_state_dir_is_rejected() {
    let daemon = TestDaemon::spawn().await;

    let result = lifecycle::startup(&daemon.config);
    assert!(matches!(
        result,
        Err(lifecycle::LifecycleError::LockFailed(_))
    ));
}

#[tokio::test]
async fn hello_reports_protocol_version() {
    let daemon = TestDaemon::spawn().await;
    let mut client = daemon.client().await;

    let reply = client
        .request(ClientMessage::Hello {
            version: "test".to_string(),
        })
        .await;

    assert_eq!(
        reply,
        ServerMessage::Hello {
            version: PROTOCOL_VERSION.to_string(),
        }
    );
}

#[tokio::test]
async fn status_reports_session_and_event_counts() {
    let daemon = TestDaemon::spawn().await;
    let mut client = daemon.client().await;
    create_event(&mut client, "launch", 10).await;

    let reply = client.request(ClientMessage::Status).await;

    match reply {
        ServerMessage::Status {
            online_sessions,
            events,
            ..
        } => {
            assert_eq!(online_sessions, 1);
            assert_eq!(events, 1);
        }
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn shutdown_message_signals_the_main_loop() {
    let daemon = TestDaemon::spawn().await;
    let mut client = daemon.client().await;

    let notified = daemon.ctx.shutdown.notified();
    tokio::pin!(notified);
    notified.as_mut().enable();

    let reply = client.request(ClientMessage::Shutdown).await;
    assert_eq!(reply, ServerMessage::ShuttingDown);

    tokio::time::timeout(SPEC_WAIT, notified)
        .await
        .expect("shutdown was signalled");
}

#[tokio::test]
async fn malformed_frames_get_an_error_not_a_hangup() {
    let daemon = TestDaemon::spawn().await;
    let mut client = daemon.client().await;

    client.send_raw(b"not json").await;
    let reply = client
        .expect_message(|m| matches!(m, ServerMessage::Error { .. }))
        .await;
    match reply {
        ServerMessage::Error { message } => assert!(message.contains("malformed")),
        other => panic!("unexpected reply: {other:?}"),
    }

    // Connection still works
    let reply = client.request(ClientMessage::ListEvents).await;
    assert!(matches!(reply, ServerMessage::Events { .. }));
}
