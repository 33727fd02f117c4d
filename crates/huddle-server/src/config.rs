//! Server configuration: an optional TOML file, overridden by CLI flags.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;

use huddle_core::adapters::router::DEFAULT_OUTBOUND_BUFFER;

#[derive(Debug, Default, Parser)]
#[command(name = "huddle-server", version, about = "WebRTC signalling hub")]
pub struct Args {
    /// TOML file with server settings.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// HTTP/WebSocket listen address.
    #[arg(long)]
    pub listen: Option<SocketAddr>,

    /// Also accept QUIC signalling clients on this address.
    #[arg(long)]
    pub quic_listen: Option<SocketAddr>,

    /// Per-connection outbound queue depth.
    #[arg(long)]
    pub outbound_buffer: Option<usize>,

    /// Serve static client files from this directory.
    #[arg(long)]
    pub static_dir: Option<PathBuf>,

    /// Redirect plain-HTTP requests arriving through a reverse proxy.
    #[arg(long)]
    pub enforce_https: bool,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long)]
    pub log: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub quic_listen: Option<SocketAddr>,
    pub outbound_buffer: usize,
    pub static_dir: Option<PathBuf>,
    pub enforce_https: bool,
    pub log: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
            quic_listen: None,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
            static_dir: None,
            enforce_https: false,
            log: "info".to_owned(),
        }
    }
}

impl ServerConfig {
    pub fn load(args: &Args) -> anyhow::Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply(args);
        anyhow::ensure!(config.outbound_buffer > 0, "outbound_buffer must be at least 1");
        Ok(config)
    }

    fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    fn apply(&mut self, args: &Args) {
        if let Some(listen) = args.listen {
            self.listen = listen;
        }
        if args.quic_listen.is_some() {
            self.quic_listen = args.quic_listen;
        }
        if let Some(buffer) = args.outbound_buffer {
            self.outbound_buffer = buffer;
        }
        if args.static_dir.is_some() {
            self.static_dir = args.static_dir.clone();
        }
        if args.enforce_https {
            self.enforce_https = true;
        }
        if let Some(log) = &args.log {
            self.log = log.clone();
        }
    }
}
