//! WebSocket Spectator Endpoint
//!
//! Delivery-only socket surface: each connection gets a hub subscription and
//! receives round events as JSON frames. Inbound frames are drained and
//! ignored except Close; bets and cash-outs belong to the HTTP surface,
//! which is outside this crate.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::network::hub::BroadcastHub;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().expect("static addr"),
            max_connections: 1000,
        }
    }
}

/// Spectator server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the configured address.
    #[error("failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),
}

/// WebSocket fan-out server.
pub struct SpectatorServer {
    config: ServerConfig,
    hub: BroadcastHub,
    shutdown_tx: broadcast::Sender<()>,
}

impl SpectatorServer {
    /// Create a server over the given hub.
    pub fn new(config: ServerConfig, hub: BroadcastHub) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            hub,
            shutdown_tx,
        }
    }

    /// Signal all connection tasks and the accept loop to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Accept spectators until shutdown.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("spectator server listening on {}", self.config.bind_addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.hub.subscriber_count().await >= self.config.max_connections {
                                warn!("connection limit reached, rejecting {}", addr);
                                continue;
                            }
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => error!("accept error: {}", e),
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("shutdown signal received");
                    return Ok(());
                }
            }
        }
    }

    /// Spawn the per-connection task: bridge hub events to the socket.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let hub = self.hub.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("websocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };
            debug!("spectator connected from {}", addr);

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let mut subscription = hub.subscribe().await;

            loop {
                tokio::select! {
                    event = subscription.recv() => {
                        let Some(event) = event else {
                            // Hub dropped us (slow consumer); close out.
                            break;
                        };
                        let text = match serde_json::to_string(&event) {
                            Ok(t) => t,
                            Err(e) => {
                                error!("failed to serialize event: {}", e);
                                continue;
                            }
                        };
                        if ws_sender.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                            // Spectators have nothing to say; drain and ignore.
                            Some(Ok(_)) => {}
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }

            hub.unsubscribe(subscription.id).await;
            debug!("spectator disconnected from {}", addr);
        });
    }
}
