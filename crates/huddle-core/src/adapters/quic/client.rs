//! Native QUIC signalling client.
//!
//! Wraps a single QUIC connection with one bidirectional stream. Used by
//! native peers and the loopback tests.

use std::net::SocketAddr;
use std::sync::Arc;

use quinn::{ClientConfig, Connection, Endpoint, RecvStream, SendStream};
use rustls::pki_types::CertificateDer;
use tokio::sync::Mutex;
use tracing::info;

use crate::adapters::codec::CborSignalCodec;
use crate::application::ports::SignalCodec;
use crate::domain::signal::{ClientCommand, HubCallback};

use super::{read_frame, write_frame};

pub struct QuicSignalClient {
    endpoint: Endpoint,
    connection: Connection,
    send: Mutex<SendStream>,
    recv: Mutex<RecvStream>,
    codec: CborSignalCodec,
}

impl QuicSignalClient {
    /// Connect to a server whose certificate is `trusted`, and open the
    /// signalling stream.
    pub async fn connect(
        server_addr: SocketAddr,
        server_name: &str,
        trusted: &CertificateDer<'static>,
    ) -> anyhow::Result<Self> {
        let mut roots = rustls::RootCertStore::empty();
        roots.add(trusted.clone())?;

        let crypto =
            rustls::ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
                .with_protocol_versions(&[&rustls::version::TLS13])?
                .with_root_certificates(roots)
                .with_no_client_auth();

        let bind: SocketAddr = if server_addr.is_ipv6() {
            "[::]:0".parse()?
        } else {
            "0.0.0.0:0".parse()?
        };
        let mut endpoint = Endpoint::client(bind)?;
        endpoint.set_default_client_config(ClientConfig::new(Arc::new(
            quinn::crypto::rustls::QuicClientConfig::try_from(crypto)?,
        )));

        info!(%server_addr, "Connecting to signalling server");
        let connection = endpoint.connect(server_addr, server_name)?.await?;
        let (send, recv) = connection.open_bi().await?;

        Ok(Self {
            endpoint,
            connection,
            send: Mutex::new(send),
            recv: Mutex::new(recv),
            codec: CborSignalCodec,
        })
    }

    pub async fn send(&self, cmd: &ClientCommand) -> anyhow::Result<()> {
        let payload = self.codec.encode(cmd)?;
        let mut send = self.send.lock().await;
        write_frame(&mut send, &payload).await
    }

    /// Next callback from the hub. Errors once the server ends the stream.
    pub async fn recv(&self) -> anyhow::Result<HubCallback> {
        let mut recv = self.recv.lock().await;
        let frame = read_frame(&mut recv)
            .await?
            .ok_or_else(|| anyhow::anyhow!("signalling stream closed by server"))?;
        Ok(self.codec.decode(&frame)?)
    }

    /// Close the connection; the server treats this as a disconnect.
    pub async fn close(self) {
        self.connection.close(0u32.into(), b"bye");
        self.endpoint.wait_idle().await;
    }
}
