// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event administration commands

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use usher_core::EventId;

use crate::client::DaemonClient;
use crate::output;

#[derive(clap::Args)]
pub struct EventsArgs {
    #[command(subcommand)]
    pub command: EventsCommand,
}

#[derive(Subcommand)]
pub enum EventsCommand {
    /// List events with live availability
    List,
    /// Create an event
    Create {
        /// Event name
        name: String,
        /// Total reservable slots
        #[arg(long)]
        slots: u32,
        /// Event date, RFC 3339 (e.g. 2026-10-01T19:00:00Z)
        #[arg(long)]
        date: String,
    },
    /// Delete an event, releasing every hold and queue spot on it
    Rm {
        /// Event id
        id: u64,
    },
}

pub async fn handle(args: EventsArgs) -> Result<()> {
    let mut client = DaemonClient::connect_or_start().await?;

    match args.command {
        EventsCommand::List => {
            let events = client.list_events().await?;
            output::print_events(&events);
        }

        EventsCommand::Create { name, slots, date } => {
            let date: DateTime<Utc> = date
                .parse()
                .context("date must be RFC 3339, e.g. 2026-10-01T19:00:00Z")?;
            let message = client.create_event(name, slots, date).await?;
            println!("{message}");
        }

        EventsCommand::Rm { id } => {
            let message = client.delete_event(EventId(id)).await?;
            println!("{message}");
        }
    }
    Ok(())
}
