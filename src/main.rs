//! turnier-bot — registration reminders for turniere.discgolf.de
//!
//! What it does:
//!   1. Scrapes the tournament index once an hour
//!   2. Merges new/changed rows into the in-memory registry
//!   3. Re-reads detail pages of updated tournaments for their phases
//!   4. Posts a reminder into every guild's #tournaments channel during the
//!      hour-wide window ten hours before a registration opens
//!
//! Run:
//!   DISCORD_TOKEN=... cargo run --bin turnier-bot

mod notifier;
mod registry;
mod scheduler;

use std::env;
use std::fs::File;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use discord_notify::{Bot, Broadcaster, ChannelDirectory};
use dotenv::dotenv;
use logger::EventLogger;
use scheduler::Scheduler;
use serenity::all::{Client, GatewayIntents};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use turnier_scraper::TurnierClient;

const DISCORD_TOKEN_VAR: &str = "DISCORD_TOKEN";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let token = env::var(DISCORD_TOKEN_VAR)
        .with_context(|| format!("{DISCORD_TOKEN_VAR} needs to be set"))?;

    // Single instance lock: two bots on one token double-post reminders.
    let lock_file_path = env::temp_dir().join("turnier_bot.lock");
    let lock_file = File::create(&lock_file_path)
        .with_context(|| format!("failed to create lock file at {}", lock_file_path.display()))?;
    let mut lock = fd_lock::RwLock::new(lock_file);
    let _lock_guard = match lock.try_write() {
        Ok(guard) => guard,
        Err(_) => {
            warn!("another turnier-bot instance is already running, exiting");
            return Ok(());
        }
    };

    let channels = Arc::new(ChannelDirectory::default());
    let mut client = Client::builder(&token, GatewayIntents::GUILDS)
        .event_handler(Bot::new(channels.clone()))
        .await
        .context("failed to create discord client")?;

    let http = client.http.clone();
    let shard_manager = client.shard_manager.clone();
    let gateway = tokio::spawn(async move {
        if let Err(e) = client.start().await {
            error!("discord session ended: {e}");
        }
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = Scheduler::new(
        TurnierClient::new(),
        Broadcaster::new(http, channels),
        EventLogger::new("logs"),
    );
    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx));

    info!("Bot is now running. Press CTRL-C to exit.");
    wait_for_termination().await?;
    info!("termination signal received");

    // Scheduler first, so an in-flight cycle drains its broadcasts before
    // the Discord session goes away.
    let _ = shutdown_tx.send(true);
    let _ = scheduler_task.await;
    shard_manager.shutdown_all().await;
    let _ = gateway.await;

    info!("shutdown complete");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_termination() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    tokio::select! {
        r = tokio::signal::ctrl_c() => r.context("failed to listen for ctrl-c")?,
        _ = sigterm.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_termination() -> Result<()> {
    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")
}
