//! Connection server: one task per client, one request in flight per
//! connection at a time, and a coordinated drain on shutdown so the
//! engine is only closed once every connection has said goodbye.

use std::time::Duration;

use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::codec::{read_request, write_reply, Reply};
use crate::config::ServerConfig;
use crate::registry::dispatch;
use crate::state::SharedState;

const IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

pub async fn run(
    config: &ServerConfig,
    state: SharedState,
    mut shutdown_rx: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let bind = if config.bind.is_empty() { "0.0.0.0" } else { &config.bind };
    let addr = format!("{bind}:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "accepting connections");

    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                let conn_state = state.clone();
                let conn_shutdown = shutdown_rx.clone();
                state.stats.client_connected();
                tracing::debug!(%peer, "accepted connection");
                tasks.spawn(async move {
                    handle_connection(stream, conn_state.clone(), conn_shutdown).await;
                    conn_state.stats.client_disconnected();
                });
            }
            _ = shutdown_rx.changed() => {
                tracing::info!("shutdown signal received, no longer accepting connections");
                break;
            }
        }
    }

    while tasks.join_next().await.is_some() {}
    state.engine.close();
    tracing::info!("all connections drained, engine closed");
    Ok(())
}

async fn handle_connection(stream: TcpStream, state: SharedState, mut shutdown_rx: watch::Receiver<bool>) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let outcome = tokio::select! {
            result = tokio::time::timeout(IDLE_TIMEOUT, read_request(&mut reader)) => result,
            _ = shutdown_rx.changed() => break,
        };

        let request = match outcome {
            Ok(Ok(Some(request))) => request,
            Ok(Ok(None)) => break,
            Ok(Err(parse_error)) => {
                let _ = write_reply(&mut write_half, &Reply::Error(parse_error.wire_message())).await;
                break;
            }
            Err(_elapsed) => {
                let mut probe = [0u8; 1];
                match reader.get_ref().try_read(&mut probe) {
                    Ok(0) => tracing::debug!("idle peer closed the connection"),
                    _ => tracing::debug!("idle read deadline exceeded"),
                }
                break;
            }
        };

        if request.is_empty() {
            continue;
        }

        state.stats.command_processed();
        let reply = match dispatch(&state, &request.command, &request.args) {
            Ok(reply) => reply,
            Err(err) => Reply::Error(err.wire_message()),
        };
        if write_reply(&mut write_half, &reply).await.is_err() {
            break;
        }
    }
}
