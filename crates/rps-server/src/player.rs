//! Per-player loops.
//!
//! Each accepted player gets two tasks on the server's player
//! supervisor:
//! - the inbound loop reads moves and `END` into the registry,
//! - the outbound loop polls the round state machine and writes
//!   `ACK` / `SOL` back.
//!
//! Both share a per-connection token; whichever loop ends first
//! cancels it, so the other loop follows and the socket closes.

use std::sync::Arc;
use std::time::Duration;

use rps_core::{find_winner, Message, ResponseCode};
use rps_net::{shutdown_stream, CancellationToken, Endpoint, FramedReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::{debug, info, warn};

use crate::registry::RoundRegistry;
use crate::round::{decide, RoundStep};
use crate::types::ConnectionId;

/// Everything a player loop needs.
#[derive(Debug, Clone)]
pub(crate) struct PlayerContext {
    pub name: String,
    pub connection_id: ConnectionId,
    pub endpoint: Arc<Endpoint>,
    pub registry: RoundRegistry,
    pub connection: CancellationToken,
    pub poll_interval: Duration,
    pub server_name: String,
}

/// Run the inbound loop; always unregisters and closes on exit.
pub(crate) async fn run_inbound(
    ctx: PlayerContext,
    mut reader: FramedReader<OwnedReadHalf>,
) -> anyhow::Result<()> {
    info!("[Server] Started handling receive messages for {}.", ctx.name);

    let result = inbound_loop(&ctx, &mut reader).await;

    if ctx.registry.unregister(&ctx.name, ctx.connection_id) {
        info!("[Server] Removed {} from the game.", ctx.name);
    }
    ctx.connection.cancel();
    info!("[Server] Closed connection for {}.", ctx.name);

    result
}

async fn inbound_loop(
    ctx: &PlayerContext,
    reader: &mut FramedReader<OwnedReadHalf>,
) -> anyhow::Result<()> {
    while !ctx.connection.is_cancelled() {
        let Some(msg) = ctx.endpoint.receive_message(reader, &ctx.connection).await else {
            // Peer gone or loop cancelled.
            return Ok(());
        };

        debug!(
            "[Server] Received message from {}: ({}, {})",
            ctx.name,
            msg.text_or_empty(),
            msg.code
        );

        match msg.code {
            ResponseCode::Move => {
                ctx.registry
                    .record_move(&ctx.name, ctx.connection_id, msg.text_or_empty())?;
                info!("[Server] {} sent a move", ctx.name);
            }
            ResponseCode::End => {
                if ctx.registry.unregister(&ctx.name, ctx.connection_id) {
                    info!("[Server] Client {} disconnected.", ctx.name);
                } else {
                    warn!(
                        "[Server] Tried to remove '{}' but it was not registered",
                        ctx.name
                    );
                }
                return Ok(());
            }
            other => {
                info!(
                    "[Server] Unhandled message code '{}' received from '{}'",
                    other, ctx.name
                );
            }
        }
    }

    Ok(())
}

/// Run the outbound loop; always closes the connection on exit.
pub(crate) async fn run_outbound(
    ctx: PlayerContext,
    mut writer: OwnedWriteHalf,
) -> anyhow::Result<()> {
    info!("[Server] Started handling sending messages to {}.", ctx.name);

    let result = outbound_loop(&ctx, &mut writer).await;

    shutdown_stream(&mut writer).await;
    ctx.connection.cancel();
    info!("[Server] Stopped sending to {}.", ctx.name);

    result
}

async fn outbound_loop(ctx: &PlayerContext, writer: &mut OwnedWriteHalf) -> anyhow::Result<()> {
    let mut last_label = "";

    while !ctx.connection.is_cancelled() {
        let step = decide(ctx.connection_id, &ctx.registry.view(&ctx.name));

        if step.label() != last_label {
            debug!("[Server] {}: {}", ctx.name, step.label());
            last_label = step.label();
        }

        match step {
            RoundStep::Gone => {
                info!("[Server] {} is no longer registered", ctx.name);
                return Ok(());
            }
            RoundStep::SendAck => {
                debug!("[Server] Sending Ack to {}", ctx.name);
                ctx.endpoint
                    .send_message(writer, &Message::ack(&ctx.server_name))
                    .await?;
                ctx.registry.clear_ack(&ctx.name);
            }
            RoundStep::WaitForOpponent { clear_stale } => {
                if clear_stale {
                    ctx.registry
                        .clear_stale_solution(&ctx.name, ctx.connection_id)?;
                }
            }
            RoundStep::DiscardStaleSolution => {
                ctx.registry
                    .clear_stale_solution(&ctx.name, ctx.connection_id)?;
                info!(
                    "[Server] {}: dropped the result of a previous opponent",
                    ctx.name
                );
            }
            RoundStep::WaitForInputs | RoundStep::WaitForOpponentToReceive => {}
            RoundStep::ResetRound => {
                ctx.registry.reset_round(&ctx.name, ctx.connection_id)?;
                info!(
                    "[Server] {}: both received the solution, new round",
                    ctx.name
                );
            }
            RoundStep::DeliverSolution { opponent, pairing } => {
                let outcome = find_winner(&pairing.mine, &pairing.theirs)?;
                info!(
                    "[Server] {} chose {}, {} chose {}, so the solution is: {}",
                    ctx.name,
                    pairing.mine,
                    opponent,
                    pairing.theirs,
                    outcome.text()
                );

                let solution = Message::solution(&ctx.server_name, outcome.text());
                ctx.endpoint.send_message(writer, &solution).await?;
                ctx.registry
                    .mark_delivered(&ctx.name, ctx.connection_id, pairing)?;
            }
        }

        tokio::select! {
            _ = ctx.connection.cancelled() => break,
            _ = tokio::time::sleep(ctx.poll_interval) => {}
        }
    }

    Ok(())
}
