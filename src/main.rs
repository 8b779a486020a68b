// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

mod api;
mod config;
mod currencies;
mod db;
mod error;
mod exchange_rates;
mod logging;
mod models;
mod poller;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::path::PathBuf;

use crate::api::{CbrClient, FeedSource};
use crate::config::Config;
use crate::currencies::{RateStore, SqliteStore};
use crate::logging::init_logging;
use crate::poller::{Poller, PollerExit};

#[derive(Parser)]
#[command(version, about = "Keeps a currency table in sync with the CBR daily rates")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Poll the feed until the failure budget is spent (default)
    Run,
    /// Run a single fetch and update cycle
    Once,
    /// Print the stored currencies
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = run(&cli).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

async fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    let store = SqliteStore::connect(&config.store)
        .await
        .with_context(|| format!("Failed to open store at {}", config.store.url))?;
    store
        .initialize()
        .await
        .context("Failed to initialize currency store")?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let client = CbrClient::new(&config.feed).context("Failed to build HTTP client")?;
            tracing::info!(url = client.url(), "Starting currency poller");

            let poller = Poller::new(client, store, &config.poller, &config.store.home_currency);
            poll_until_exhausted(poller).await;
        }
        Commands::Once => {
            let client = CbrClient::new(&config.feed).context("Failed to build HTTP client")?;
            let mut poller = Poller::new(client, store, &config.poller, &config.store.home_currency);
            let report = poller.run_cycle().await?;
            let as_of = report
                .as_of
                .map(|d| d.to_string())
                .unwrap_or_else(|| "unknown date".to_string());
            println!(
                "Updated {} currencies for {} (skipped {})",
                report.written, as_of, report.skipped
            );
        }
        Commands::List => {
            for record in store.list().await? {
                let updated = record
                    .updated_at
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default();
                println!(
                    "{:<4} {:>12.4}  {:<20} {}",
                    record.char_code, record.rate, updated, record.name
                );
            }
        }
    }

    Ok(())
}

/// Drives the poller until it gives up; giving up is a normal shutdown.
async fn poll_until_exhausted<F, S>(poller: Poller<F, S>) -> PollerExit
where
    F: FeedSource,
    S: RateStore,
{
    let exit = poller.run().await;
    tracing::error!(
        failures = exit.failures,
        cycles = exit.cycles,
        "Currency poller stopped"
    );
    exit
}
