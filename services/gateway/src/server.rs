//! Order protocol listener
//!
//! One task per connection. Frames on a connection are answered in arrival
//! order; the exchange call itself runs on the blocking pool since it takes
//! the global match lock.

use crate::framing::{read_frame, write_frame, FrameError};
use crate::protocol;
use matching_engine::Exchange;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

#[derive(Clone, Copy, Debug)]
pub struct ServerSettings {
    pub max_frame_bytes: usize,
    pub dump_rows: usize,
}

/// Accept connections until `shutdown` flips to true, then wait for every
/// open connection to finish its in-flight request and close
pub async fn serve(
    listener: TcpListener,
    exchange: Arc<Exchange>,
    settings: ServerSettings,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "Order protocol listening");
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(error = %e, "Accept failed");
                        continue;
                    }
                };
                let exchange = exchange.clone();
                let shutdown = shutdown.clone();
                connections.spawn(async move {
                    if let Err(e) = handle_connection(stream, peer, exchange, settings, shutdown).await {
                        warn!(%peer, error = %e, "Connection closed with error");
                    }
                });
            }
            Some(finished) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = finished {
                    error!(error = %e, "Connection task failed");
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    info!(open = connections.len(), "Order protocol listener stopping");
    while let Some(finished) = connections.join_next().await {
        if let Err(e) = finished {
            error!(error = %e, "Connection task failed");
        }
    }
    info!("All connections drained");
    Ok(())
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    exchange: Arc<Exchange>,
    settings: ServerSettings,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    debug!(%peer, "Connection accepted");
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let frame = tokio::select! {
            frame = read_frame(&mut reader, settings.max_frame_bytes) => frame,
            _ = shutdown.changed() => break,
        };

        let payload = match frame {
            Ok(Some(payload)) => payload,
            Ok(None) => break,
            Err(FrameError::Io(e)) => return Err(e.into()),
            Err(e) => {
                // No way to resynchronise after a bad header
                warn!(%peer, error = %e, "Malformed frame");
                break;
            }
        };

        let exchange = exchange.clone();
        let response = tokio::task::spawn_blocking(move || {
            protocol::handle(&exchange, &payload, settings.dump_rows)
        })
        .await
        .inspect_err(|e| error!(%peer, error = %e, "Request task failed"))?;

        let body = serde_json::to_vec(&response)?;
        write_frame(&mut write_half, &body).await?;
    }

    debug!(%peer, "Connection closed");
    Ok(())
}
