//! tgbridged - Telegram IRC bridge daemon.
//!
//! Presents a Telegram bot account to a single IRC client as a tiny IRC
//! server: Telegram groups appear as pseudo-channels, Telegram users as
//! nicknames, and DMs as private messages.

mod cache;
mod config;
mod error;
mod handlers;
mod network;
mod session;
mod telegram;
mod translate;

use crate::cache::Roster;
use crate::config::{FeatureFlags, Secrets};
use crate::network::{Connection, Gateway};
use crate::telegram::{BotApi, Messenger};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Default file locations, relative to the working directory.
const DEFAULT_SECRETS_PATH: &str = "bridge.toml";
const FLAGS_PATH: &str = "configuration.json";
const CACHE_PATH: &str = "usercache.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration and the persisted roster
    let secrets_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_SECRETS_PATH.to_string());
    let secrets = Secrets::load(&secrets_path).map_err(|e| {
        error!(path = %secrets_path, error = %e, "Failed to load secrets config");
        e
    })?;
    let flags = FeatureFlags::load_or_create(FLAGS_PATH)?;
    let roster = Arc::new(Roster::load(CACHE_PATH)?);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting tgbridged");

    // Verify the Telegram token before opening the door to the client
    let api: Arc<dyn Messenger> = Arc::new(BotApi::new(&secrets.telegram.token));
    let profile = api.authenticate().await.map_err(|e| {
        error!(error = %e, "Telegram authentication failed");
        anyhow::anyhow!("telegram authentication failed: {e}")
    })?;
    info!(
        bot_id = profile.id,
        bot_username = ?profile.username,
        "Telegram interface initialized"
    );

    // One listener, one client, one session
    let gateway = Gateway::bind(&secrets.irc.listen_address, secrets.irc.listen_port).await;
    let (stream, _addr) = gateway.accept_one().await?;

    let connection = Connection::new(stream, roster, flags, api);
    if let Err(e) = connection.run().await {
        // The single fatal path. Cache writes are synchronous and already
        // on disk; dropping the connection closes the socket, then exit.
        error!(error = %e, "Socket failure, shutting bridge down");
        return Err(e.into());
    }
    Ok(())
}
