//! Port traits (interfaces) that use cases depend on.
//!
//! Adapters implement these traits; use cases never reference axum, quinn, etc.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::error::{CodecError, HubError};
use crate::domain::identity::ConnectionId;
use crate::domain::signal::HubCallback;

// ---------------------------------------------------------------------------
// ConnectionTransport (delivery to connected clients)
// ---------------------------------------------------------------------------

/// Delivers hub callbacks to live client sessions.
///
/// Only `send_to` is required. The multicast forms loop over it so that one
/// failed recipient never stops delivery to the rest; each failure is
/// returned to the caller for logging.
#[async_trait]
pub trait ConnectionTransport: Send + Sync {
    /// Unicast one callback.
    async fn send_to(&self, conn: &ConnectionId, msg: HubCallback) -> Result<(), HubError>;

    /// Deliver the same callback to every connection in `conns`.
    async fn send_to_many(&self, conns: &[ConnectionId], msg: &HubCallback) -> Vec<HubError> {
        let mut failures = Vec::new();
        for conn in conns {
            if let Err(e) = self.send_to(conn, msg.clone()).await {
                failures.push(e);
            }
        }
        failures
    }

    /// Like [`send_to_many`](Self::send_to_many), skipping `except`.
    async fn send_to_many_except(
        &self,
        conns: &[ConnectionId],
        except: &ConnectionId,
        msg: &HubCallback,
    ) -> Vec<HubError> {
        let targets: Vec<ConnectionId> = conns.iter().filter(|c| *c != except).cloned().collect();
        self.send_to_many(&targets, msg).await
    }
}

// ---------------------------------------------------------------------------
// SignalCodec (serialization)
// ---------------------------------------------------------------------------

/// Encodes / decodes signalling messages to/from bytes (JSON or CBOR).
pub trait SignalCodec: Send + Sync {
    fn encode<T: Serialize>(&self, msg: &T) -> Result<Vec<u8>, CodecError>;
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError>;
}
