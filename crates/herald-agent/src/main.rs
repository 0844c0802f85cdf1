//! # herald
//!
//! Binary entry point for the live notification channel:
//!
//! - `herald serve` runs the WebSocket server
//! - `herald watch` connects as an admin client and raises alerts
//! - `herald publish` pushes one event through a running server

#![deny(unsafe_code)]

mod publish;
mod serve;
mod watch;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use herald_settings::HeraldSettings;

/// Live admin notification channel.
#[derive(Parser, Debug)]
#[command(name = "herald", about = "Live admin notification channel", version)]
struct Cli {
    /// Settings file (defaults to `~/.herald/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the notification server.
    Serve(serve::ServeArgs),
    /// Connect to a server and print alerts as events arrive.
    Watch(watch::WatchArgs),
    /// Publish one event through a running server.
    Publish(publish::PublishArgs),
}

impl Cli {
    fn load_settings(&self) -> Result<HeraldSettings> {
        let path = self
            .settings
            .clone()
            .unwrap_or_else(herald_settings::settings_path);
        herald_settings::load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.load_settings()?;

    let level = cli.log_level.as_deref().unwrap_or(&settings.logging.level);
    if !herald_core::logging::init_subscriber(level) {
        tracing::debug!("tracing subscriber already installed");
    }

    match cli.command {
        Command::Serve(args) => serve::run(args, &settings).await,
        Command::Watch(args) => watch::run(args, &settings).await,
        Command::Publish(args) => publish::run(args, &settings).await,
    }
}
