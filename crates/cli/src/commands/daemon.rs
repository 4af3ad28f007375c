// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon management commands

use anyhow::Result;
use clap::Subcommand;

use crate::client::{self, DaemonClient};

#[derive(clap::Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon in the background
    Start,
    /// Stop the running daemon
    Stop,
    /// Show daemon status
    Status,
}

pub async fn handle(args: DaemonArgs) -> Result<()> {
    match args.command {
        DaemonCommand::Start => match DaemonClient::connect().await {
            Ok(_) => println!("Daemon already running"),
            Err(client::ClientError::DaemonNotRunning) => {
                let mut client = DaemonClient::connect_or_start().await?;
                let version = client.hello().await?;
                println!("Daemon started (protocol v{version})");
            }
            Err(e) => return Err(e.into()),
        },

        DaemonCommand::Stop => {
            if client::daemon_stop().await? {
                println!("Daemon stopped");
            } else {
                println!("Daemon not running");
            }
        }

        DaemonCommand::Status => match DaemonClient::connect().await {
            Ok(mut client) => {
                let (uptime_secs, online_sessions, events) = client.status().await?;
                println!("Daemon running");
                println!("  Uptime: {}s", uptime_secs);
                println!("  Online sessions: {}", online_sessions);
                println!("  Events: {}", events);
            }
            Err(client::ClientError::DaemonNotRunning) => println!("Daemon not running"),
            Err(e) => return Err(e.into()),
        },
    }
    Ok(())
}
