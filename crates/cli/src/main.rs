// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! usher - Reservation admission CLI

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{daemon, events, settings, watch};

use crate::client::DaemonClient;

#[derive(Parser)]
#[command(
    name = "usher",
    version,
    about = "Reservation admission coordinator"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daemon management
    Daemon(daemon::DaemonArgs),
    /// Event administration
    Events(events::EventsArgs),
    /// Admission settings
    Settings(settings::SettingsArgs),
    /// Stream an event's queue and timer pushes
    Watch(watch::WatchArgs),
    /// Show daemon status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon(args) => daemon::handle(args).await,
        Commands::Events(args) => events::handle(args).await,
        Commands::Settings(args) => settings::handle(args).await,
        Commands::Watch(args) => watch::handle(args).await,
        Commands::Status => {
            let mut client = DaemonClient::connect().await?;
            let (uptime_secs, online_sessions, events) = client.status().await?;
            println!("Daemon running");
            println!("  Uptime: {}s", uptime_secs);
            println!("  Online sessions: {}", online_sessions);
            println!("  Events: {}", events);
            Ok(())
        }
    }
}
