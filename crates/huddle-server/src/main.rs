//! Standalone signalling hub server binary.

mod config;

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use huddle_core::adapters::http::{self, HttpOptions};
use huddle_core::adapters::quic::server::QuicSignalServer;
use huddle_core::adapters::router::ConnectionRouter;
use huddle_core::adapters::ws::SignalState;
use huddle_core::application::hub::SignallingHub;
use huddle_core::application::registry::ChannelRegistry;

use crate::config::{Args, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = ServerConfig::load(&args)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log)),
        )
        .init();

    let registry = Arc::new(ChannelRegistry::new());
    let connections = Arc::new(ConnectionRouter::new(config.outbound_buffer));
    let hub = Arc::new(SignallingHub::new(registry, connections.clone()));

    let quic = match config.quic_listen {
        Some(addr) => {
            let server = Arc::new(QuicSignalServer::bind(addr, hub.clone(), connections.clone())?);
            let runner = Arc::clone(&server);
            tokio::spawn(async move {
                if let Err(e) = runner.run().await {
                    error!("QUIC server exited: {e}");
                }
            });
            Some(server)
        }
        None => None,
    };

    let listener = TcpListener::bind(config.listen).await?;
    let app = http::app(
        SignalState { hub, connections },
        &HttpOptions {
            static_dir: config.static_dir.clone(),
            enforce_https: config.enforce_https,
        },
    );
    info!(listen = %config.listen, quic = ?config.quic_listen, "Signalling hub starting");

    http::serve(listener, app, shutdown_signal()).await?;

    if let Some(server) = quic {
        server.close();
    }
    info!("Signalling hub stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C, running until killed: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
