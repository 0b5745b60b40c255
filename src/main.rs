//! Crashpoint Game Server
//!
//! Wires the round engine, broadcast hub, wallet, and round store together
//! and serves spectators over WebSocket.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crashpoint::game::engine::{EngineConfig, RoundEngine};
use crashpoint::network::hub::BroadcastHub;
use crashpoint::network::server::{ServerConfig, SpectatorServer};
use crashpoint::store::MemoryRoundStore;
use crashpoint::wallet::MemoryWallet;
use crashpoint::{EntropySeedSource, BETTING_WINDOW_SECS, TICK_INTERVAL_MS, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Crashpoint Server v{}", VERSION);
    info!("Tick interval: {} ms", TICK_INTERVAL_MS);
    info!("Betting window: {} s", BETTING_WINDOW_SECS);

    let mut server_config = ServerConfig::default();
    if let Ok(addr) = std::env::var("CRASHPOINT_BIND") {
        server_config.bind_addr = addr
            .parse()
            .with_context(|| format!("invalid CRASHPOINT_BIND address: {addr}"))?;
    }

    let hub = BroadcastHub::new();
    let wallet = Arc::new(MemoryWallet::new());
    let store = Arc::new(MemoryRoundStore::new());

    // The handle keeps the engine alive; the HTTP/bot surface would hold it
    // to route bets and cash-outs.
    let _engine = RoundEngine::spawn(
        EngineConfig::default(),
        hub.clone(),
        wallet,
        store,
        Box::new(EntropySeedSource),
    );

    let server = SpectatorServer::new(server_config, hub);
    server.run().await.context("spectator server failed")?;

    Ok(())
}
