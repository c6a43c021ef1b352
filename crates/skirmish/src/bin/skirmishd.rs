//! Skirmish lobby server daemon.

use std::time::Duration;

use clap::Parser;
use skirmish::prelude::*;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "skirmishd")]
#[command(about = "Lobby server for turn-based strategy games")]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:5438")]
    bind: String,

    /// Maximum number of frames and deliveries handled at once
    #[arg(long, default_value_t = 64)]
    workers: usize,

    /// Fingerprint of the game content clients must match
    #[arg(long, env = "SKIRMISH_CONTENT", default_value = "")]
    content: String,

    /// Relay in-game events between members of started rooms
    #[arg(long)]
    relay_game_events: bool,

    /// Seconds a new socket gets to complete the WebSocket upgrade
    #[arg(long, default_value_t = 10)]
    handshake_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), SkirmishError> {
    // RUST_LOG overrides; info otherwise.
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = ServerConfig {
        bind: cli.bind,
        workers: cli.workers,
        content_fingerprint: cli.content,
        relay_game_events: cli.relay_game_events,
        handshake_timeout: Duration::from_secs(cli.handshake_timeout_secs),
    };
    tracing::info!(
        v_string = %verification_string(&config.content_fingerprint),
        "clients must present this verification string"
    );

    let server = SkirmishServer::builder().config(config).build().await?;
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "could not listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("ctrl-c received");
        })
        .await
}
