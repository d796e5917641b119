//! TCP game server binary.

use rps_server::{GameServer, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;

    info!(
        "Starting rps-server on {} (max_players = {}, poll = {:?})",
        config.socket_addr_string(),
        config.max_players,
        config.poll_interval
    );

    let server = GameServer::bind(config);
    if !server.is_listening() {
        anyhow::bail!("server is not listening");
    }
    server.start();

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    server.dispose();

    Ok(())
}
