//! # Garuda Server Binary
//!
//! The process entry point has two personalities, selected by a single flag:
//!
//! - **Supervisor** (default): loads configuration, starts one worker process
//!   per configured channel via [`ChannelsController`], and waits for a
//!   shutdown signal.
//! - **Worker** (`--worker-channel <identifier>`): re-exec'd by the
//!   supervisor. Builds its own [`CoreController`] and a single channel
//!   plugin looked up from [`ChannelRegistry`], then runs that channel until
//!   told to stop.
//!
//! ## Usage
//!
//! ```bash
//! garuda-server --config garuda.toml
//! ```
//!
//! The reference plugin set wired up here (`testing::reference_plugins`) is a
//! starting point for a host application, not a production plugin set; swap
//! it for your own wiring to go further.

use clap::Parser;
use garuda_server::config::Config;
use garuda_server::controllers::{register_builtin_channels, ChannelRegistry, ChannelsController, CoreController};
use garuda_server::session_store::RedisSessionStore;
use garuda_server::testing::reference_plugins;
use garuda_sdk::entities;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "garuda.toml")]
    config: String,

    /// Set by the supervisor when it re-execs a worker process. Runs a
    /// single channel instead of forking the full channel set.
    #[arg(long)]
    worker_channel: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load(&args.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(config.logging.level.clone())
        .init();

    match &args.worker_channel {
        Some(identifier) => run_worker(config, identifier).await,
        None => run_supervisor(config, args.config).await,
    }
}

async fn run_supervisor(config: Config, config_path: String) -> anyhow::Result<()> {
    tracing::info!("starting garuda channel supervisor");
    let channels = ChannelsController::new(config_path, config.channels.clone());
    channels.start()?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    channels.stop()?;
    Ok(())
}

async fn run_worker(config: Config, identifier: &str) -> anyhow::Result<()> {
    let channel_config = config
        .channels
        .iter()
        .find(|channel| channel.identifier == identifier)
        .ok_or_else(|| anyhow::anyhow!("no channel configured with identifier '{identifier}'"))?
        .clone();

    let registry = ChannelRegistry::new();
    register_builtin_channels(&registry);
    let mut channel = registry.build(&channel_config)?;

    let store = Arc::new(RedisSessionStore::connect(&config.redis.url).await?);
    let bundle = entities::reference_bundle();
    let (auth, storage, permissions, logic) = reference_plugins(bundle.clone());

    let core = CoreController::new(config, bundle, store, auth, storage, permissions, logic);
    core.start().await?;

    tracing::info!(channel = identifier, "channel worker starting");
    channel.did_fork().await?;
    let result = channel.run(Arc::clone(&core)).await;
    channel.did_exit().await?;
    core.stop().await?;

    result.map_err(Into::into)
}
