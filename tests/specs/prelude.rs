//! Shared test harness for workspace specs
//!
//! Spins up a real daemon (socket listener plus connection tasks) on a
//! temp directory, and provides a raw protocol client to talk to it.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use usher_daemon::lifecycle::{self, Config};
use usher_daemon::protocol::{self, ClientMessage, ServerMessage};
use usher_daemon::server::{self, ServerContext};

/// Upper bound for waiting on a single expected message
pub const SPEC_WAIT: Duration = Duration::from_secs(5);

/// A daemon running in-process on a temp state directory
pub struct TestDaemon {
    pub config: Config,
    pub ctx: Arc<ServerContext>,
    accept_task: tokio::task::JoinHandle<()>,
    _dir: TempDir,
}

impl TestDaemon {
    pub async fn spawn() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        Self::spawn_in(dir).await
    }

    /// Start a daemon on an existing directory (restart scenarios)
    pub async fn spawn_in(dir: TempDir) -> Self {
        let config = test_config(dir.path());
        let daemon = lifecycle::startup(&config).expect("daemon startup");
        let ctx = Arc::clone(&daemon.ctx);

        let accept_ctx = Arc::clone(&ctx);
        let accept_task = tokio::spawn(async move {
            // Capture the whole DaemonState (not just `listener` via
            // disjoint capture) so the lock file stays held until this
            // task ends.
            let daemon = daemon;
            loop {
                let Ok((stream, _)) = daemon.listener.accept().await else {
                    break;
                };
                tokio::spawn(server::handle_connection(Arc::clone(&accept_ctx), stream));
            }
        });

        Self {
            config,
            ctx,
            accept_task,
            _dir: dir,
        }
    }

    pub async fn client(&self) -> TestClient {
        TestClient::connect(&self.config.socket_path).await
    }

    /// Stop the daemon and hand back the state directory for reuse
    pub async fn stop(self) -> TempDir {
        // DaemonState (lock file, listener) lives inside the accept
        // task; aborting and awaiting it releases both.
        self.accept_task.abort();
        let _ = self.accept_task.await;
        self._dir
    }
}

pub fn test_config(dir: &Path) -> Config {
    Config {
        state_dir: dir.join("state"),
        socket_path: dir.join("usherd.sock"),
        lock_path: dir.join("state").join("usherd.pid"),
        log_path: dir.join("state").join("usherd.log"),
    }
}

/// Raw protocol client: one connection, one session
pub struct TestClient {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
}

impl TestClient {
    pub async fn connect(socket_path: &Path) -> Self {
        let stream = UnixStream::connect(socket_path).await.expect("connect");
        let (reader, writer) = stream.into_split();
        Self { reader, writer }
    }

    pub async fn send(&mut self, message: &ClientMessage) {
        let data = protocol::encode(message).expect("encode");
        protocol::write_message(&mut self.writer, &data)
            .await
            .expect("write");
    }

    pub async fn send_raw(&mut self, data: &[u8]) {
        protocol::write_message(&mut self.writer, data)
            .await
            .expect("write");
    }

    pub async fn recv(&mut self) -> ServerMessage {
        tokio::time::timeout(SPEC_WAIT, protocol::read_server_message(&mut self.reader))
            .await
            .expect("timed out waiting for server message")
            .expect("read")
    }

    /// Send a request and return its reply, skipping interleaved pushes
    pub async fn request(&mut self, message: ClientMessage) -> ServerMessage {
        self.send(&message).await;
        loop {
            let reply = self.recv().await;
            if !reply.is_push() {
                return reply;
            }
        }
    }

    /// Read messages until one satisfies the predicate
    pub async fn expect_message<F>(&mut self, mut pred: F) -> ServerMessage
    where
        F: FnMut(&ServerMessage) -> bool,
    {
        let deadline = tokio::time::Instant::now() + SPEC_WAIT;
        loop {
            assert!(
                tokio::time::Instant::now() < deadline,
                "expected message did not arrive"
            );
            let message = self.recv().await;
            if pred(&message) {
                return message;
            }
        }
    }
}

/// Create an event through the wire, returning its id from the reply
pub async fn create_event(
    client: &mut TestClient,
    name: &str,
    slots: u32,
) -> usher_core::EventId {
    let reply = client
        .request(ClientMessage::CreateEvent {
            name: name.to_string(),
            slots,
            date: "2026-10-01T19:00:00Z".parse().expect("valid date"),
        })
        .await;
    match reply {
        ServerMessage::Ack { message } => {
            let id = message
                .rsplit(' ')
                .next()
                .and_then(|id| id.parse().ok())
                .expect("event id in ack");
            usher_core::EventId(id)
        }
        other => panic!("create failed: {other:?}"),
    }
}
