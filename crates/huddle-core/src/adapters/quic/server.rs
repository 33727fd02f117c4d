//! Quinn-based QUIC signalling server.
//!
//! Accepts client connections, registers each with the [`ConnectionRouter`],
//! feeds decoded commands to the [`SignallingHub`] and runs disconnect
//! cleanup when the stream or connection ends.

use std::net::SocketAddr;
use std::sync::Arc;

use quinn::{Connection, Endpoint, ServerConfig};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tracing::{debug, info, warn};

use crate::adapters::codec::CborSignalCodec;
use crate::adapters::router::ConnectionRouter;
use crate::application::hub::SignallingHub;
use crate::application::ports::SignalCodec;
use crate::domain::signal::ClientCommand;

use super::{read_frame, write_frame};

pub struct QuicSignalServer {
    endpoint: Endpoint,
    certificate: CertificateDer<'static>,
    hub: Arc<SignallingHub>,
    connections: Arc<ConnectionRouter>,
    codec: CborSignalCodec,
}

impl QuicSignalServer {
    /// Create and bind the server with a fresh self-signed certificate.
    pub fn bind(
        bind_addr: SocketAddr,
        hub: Arc<SignallingHub>,
        connections: Arc<ConnectionRouter>,
    ) -> anyhow::Result<Self> {
        let (server_config, certificate) = Self::generate_self_signed_config()?;
        let endpoint = Endpoint::server(server_config, bind_addr)?;
        info!(addr = %endpoint.local_addr()?, "QUIC listener ready");

        Ok(Self {
            endpoint,
            certificate,
            hub,
            connections,
            codec: CborSignalCodec,
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.endpoint.local_addr()?)
    }

    /// DER certificate clients must trust to connect.
    pub fn certificate(&self) -> &CertificateDer<'static> {
        &self.certificate
    }

    /// Run the accept loop until [`close`](Self::close) is called.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        while let Some(incoming) = self.endpoint.accept().await {
            let server = Arc::clone(&self);
            tokio::spawn(async move {
                match incoming.await {
                    Ok(conn) => {
                        if let Err(e) = server.handle_connection(conn).await {
                            debug!("QUIC session ended with error: {e}");
                        }
                    }
                    Err(e) => warn!("Failed to accept connection: {e}"),
                }
            });
        }
        Ok(())
    }

    /// Stop accepting and close every open connection.
    pub fn close(&self) {
        self.endpoint.close(0u32.into(), b"server shutdown");
    }

    // -----------------------------------------------------------------------
    // Connection handling
    // -----------------------------------------------------------------------

    async fn handle_connection(&self, connection: Connection) -> anyhow::Result<()> {
        let remote = connection.remote_address();
        let (mut send, mut recv) = connection.accept_bi().await?;

        let (conn, mut outbound) = self.connections.register();
        info!(%conn, %remote, "QUIC session started");

        let codec = self.codec;
        let writer_conn = conn.clone();
        let writer = tokio::spawn(async move {
            while let Some(msg) = outbound.recv().await {
                let payload = match codec.encode(&msg) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(conn = %writer_conn, "Failed to encode callback: {e}");
                        continue;
                    }
                };
                if let Err(e) = write_frame(&mut send, &payload).await {
                    debug!(conn = %writer_conn, "Stream write failed: {e}");
                    break;
                }
            }
            let _ = send.finish();
        });

        let result = loop {
            match read_frame(&mut recv).await {
                Ok(Some(frame)) => match self.codec.decode::<ClientCommand>(&frame) {
                    Ok(cmd) => self.hub.dispatch(&conn, cmd).await,
                    Err(e) => warn!(%conn, "Dropping undecodable frame: {e}"),
                },
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        // Cleanup: leave every channel, then release the outbound queue so the
        // writer drains and exits.
        self.hub.disconnect(&conn).await;
        self.connections.unregister(&conn);
        let _ = writer.await;
        info!(%conn, "QUIC session ended");

        result
    }

    // -----------------------------------------------------------------------
    // Self-signed TLS config (dev only)
    // -----------------------------------------------------------------------

    fn generate_self_signed_config() -> anyhow::Result<(ServerConfig, CertificateDer<'static>)> {
        let cert = rcgen::generate_simple_self_signed(vec!["localhost".into()])?;
        let cert_der = CertificateDer::from(cert.cert.der().to_vec());
        let key_der = PrivatePkcs8KeyDer::from(cert.key_pair.serialize_der());

        let server_crypto =
            rustls::ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
                .with_protocol_versions(&[&rustls::version::TLS13])?
                .with_no_client_auth()
                .with_single_cert(vec![cert_der.clone()], PrivateKeyDer::Pkcs8(key_der))?;

        let mut transport_config = quinn::TransportConfig::default();
        transport_config.max_idle_timeout(Some(quinn::IdleTimeout::try_from(
            std::time::Duration::from_secs(30),
        )?));
        transport_config.keep_alive_interval(Some(std::time::Duration::from_secs(10)));

        let mut server_config = ServerConfig::with_crypto(Arc::new(
            quinn::crypto::rustls::QuicServerConfig::try_from(server_crypto)?,
        ));
        server_config.transport_config(Arc::new(transport_config));

        Ok((server_config, cert_der))
    }
}
