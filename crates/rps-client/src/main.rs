// crates/rps-client/src/main.rs

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use rps_client::{ClientConfig, GameClient};
use rps_core::{Move, ResponseCode};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(name = "rps-client")]
#[clap(about = "Play rock/paper/scissors against another player")]
struct Cli {
    /// Server address
    #[clap(short, long)]
    server: Option<String>,

    /// Player name, unique per game
    #[clap(short, long)]
    name: Option<String>,

    /// TOML file with `server_addr` / `player_name`
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

impl Cli {
    fn client_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load(path)?,
            None => ClientConfig::default(),
        };
        if let Some(server) = &self.server {
            config.server_addr = server.clone();
        }
        if let Some(name) = &self.name {
            config.player_name = name.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = cli.client_config()?;
    info!("Connecting to {} as {}...", config.server_addr, config.player_name);

    let (client, mut events) = GameClient::start(config);
    if !client.wait_established().await {
        anyhow::bail!("server did not accept {}", client.name());
    }

    let tokens: Vec<&str> = Move::ALL.iter().map(|m| m.as_token()).collect();
    println!("Enter your move ({}), or 'quit' to leave.", tokens.join(" / "));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => {
                    let line = line.trim();
                    match line {
                        "" => {}
                        "quit" | "exit" => client.leave(),
                        _ => {
                            if line.parse::<Move>().is_err() {
                                warn!("'{}' is not a known move, sending it anyway", line);
                            }
                            if client.awaiting_ack() {
                                println!("(queued until the server confirms your last move)");
                            }
                            client.send_local_move(line);
                        }
                    }
                }
                None => {
                    stdin_open = false;
                    client.leave();
                }
            },
            event = events.recv() => match event {
                Some(msg) => match msg.code {
                    ResponseCode::Solution => println!(">> {}", msg.text_or_empty()),
                    ResponseCode::Ack => println!("(move received by the server)"),
                    code if code.is_terminal() => {
                        println!("Server closed the game.");
                        break;
                    }
                    _ => println!("{}", msg),
                },
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    client.dispose();
    Ok(())
}
