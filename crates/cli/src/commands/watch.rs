//! Live watch of an event's admission state

use anyhow::Result;
use usher_core::EventId;
use usher_daemon::protocol::ProtocolError;

use crate::client::{ClientError, DaemonClient};
use crate::output;

#[derive(clap::Args)]
pub struct WatchArgs {
    /// Event id to watch
    pub event_id: u64,
}

pub async fn handle(args: WatchArgs) -> Result<()> {
    let event_id = EventId(args.event_id);
    let mut client = DaemonClient::connect_or_start().await?;
    client.watch(event_id).await?;

    println!("Watching event {event_id} (ctrl-c to stop)");
    loop {
        tokio::select! {
            message = client.next_message() => {
                match message {
                    Ok(message) => output::print_push(&message),
                    Err(ClientError::Protocol(ProtocolError::ConnectionClosed)) => {
                        println!("Daemon closed the connection");
                        break;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}
