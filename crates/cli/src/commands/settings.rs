// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission settings commands

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::client::DaemonClient;
use crate::output;

#[derive(clap::Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommand,
}

#[derive(Subcommand)]
pub enum SettingsCommand {
    /// Show current admission settings
    Show,
    /// Update admission settings; omitted fields keep their value
    Set {
        /// Maximum simultaneous pending holds per event
        #[arg(long)]
        max_users: Option<u32>,
        /// Choice-phase countdown (e.g. 30s)
        #[arg(long)]
        choice_timeout: Option<String>,
        /// Details-phase countdown (e.g. 2m)
        #[arg(long)]
        reservation_timeout: Option<String>,
    },
}

pub async fn handle(args: SettingsArgs) -> Result<()> {
    let mut client = DaemonClient::connect_or_start().await?;

    match args.command {
        SettingsCommand::Show => {
            let settings = client.get_settings().await?;
            output::print_settings(&settings);
        }

        SettingsCommand::Set {
            max_users,
            choice_timeout,
            reservation_timeout,
        } => {
            let mut settings = client.get_settings().await?;
            if let Some(n) = max_users {
                settings.max_users = n;
            }
            if let Some(s) = choice_timeout {
                settings.choice_timeout =
                    humantime::parse_duration(&s).context("choice timeout, e.g. 30s")?;
            }
            if let Some(s) = reservation_timeout {
                settings.reservation_timeout =
                    humantime::parse_duration(&s).context("reservation timeout, e.g. 2m")?;
            }

            client.update_settings(settings.clone()).await?;
            println!("Settings updated");
            output::print_settings(&settings);
        }
    }
    Ok(())
}
