pub mod errors;
pub mod game;
pub mod gateway;
pub mod models;
pub mod registry;
pub mod session;
pub mod transport;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::app::types;

use game::{Dice, RandomDice};
use gateway::Gateway;
use registry::SessionRegistry;

/// Install the global subscriber, `RUST_LOG` overrides the default `info` level
pub fn init_tracing() {
    let formatter = tracing_subscriber::fmt::format()
        .with_file(true)
        .with_line_number(true);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // A second initialisation, from tests for instance, is harmless
    let _ = tracing_subscriber::fmt()
        .event_format(formatter)
        .with_env_filter(filter)
        .try_init();
}

pub fn build_gateway(config: &types::ServerConfig, dice: Arc<dyn Dice>) -> Arc<Gateway> {
    let rooms_config = config.rooms.clone().unwrap_or_default();
    let registry = SessionRegistry::new(&rooms_config);

    Arc::new(Gateway::new(registry, dice, rooms_config.channel_capacity))
}

pub async fn bind(config: &types::ServerConfig) -> std::io::Result<tokio::net::TcpListener> {
    let server_config = config.server.clone().unwrap_or_default();
    let server_address = format!("{}:{}", server_config.host, server_config.port);

    tracing::info!("Attempting to run server on {:?}", server_address);
    tokio::net::TcpListener::bind(server_address).await
}

pub async fn start_server(
    config: types::ServerConfig,
    tcp_listener: tokio::net::TcpListener,
) -> std::io::Result<()> {
    let gateway = build_gateway(&config, Arc::new(RandomDice));

    tracing::info!(
        "Server successfully running on {:?}",
        tcp_listener.local_addr()?
    );
    transport::serve(tcp_listener, gateway).await
}
