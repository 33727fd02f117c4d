//! In-process [`ConnectionTransport`]: one bounded outbound queue per live
//! connection.
//!
//! Transport sessions register here when they start and drain their queue
//! into the socket. Delivery never waits on a slow client: a full queue is a
//! delivery failure for that one recipient.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::debug;

use crate::application::ports::ConnectionTransport;
use crate::domain::error::HubError;
use crate::domain::identity::ConnectionId;
use crate::domain::signal::HubCallback;

/// Default per-connection queue depth.
pub const DEFAULT_OUTBOUND_BUFFER: usize = 256;

pub struct ConnectionRouter {
    connections: RwLock<HashMap<ConnectionId, mpsc::Sender<HubCallback>>>,
    buffer: usize,
}

impl ConnectionRouter {
    pub fn new(buffer: usize) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            buffer: buffer.max(1),
        }
    }

    /// Issue a fresh connection id and its outbound queue.
    pub fn register(&self) -> (ConnectionId, mpsc::Receiver<HubCallback>) {
        let id = ConnectionId::generate();
        let (tx, rx) = mpsc::channel(self.buffer);
        let mut connections = self.connections.write();
        connections.insert(id.clone(), tx);
        debug!(conn = %id, active = connections.len(), "Connection registered");
        (id, rx)
    }

    pub fn unregister(&self, id: &ConnectionId) {
        let mut connections = self.connections.write();
        if connections.remove(id).is_some() {
            debug!(conn = %id, active = connections.len(), "Connection unregistered");
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }
}

impl Default for ConnectionRouter {
    fn default() -> Self {
        Self::new(DEFAULT_OUTBOUND_BUFFER)
    }
}

#[async_trait]
impl ConnectionTransport for ConnectionRouter {
    async fn send_to(&self, conn: &ConnectionId, msg: HubCallback) -> Result<(), HubError> {
        let tx = self
            .connections
            .read()
            .get(conn)
            .cloned()
            .ok_or_else(|| HubError::delivery(conn, "unknown connection"))?;

        tx.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => HubError::delivery(conn, "outbound queue full"),
            mpsc::error::TrySendError::Closed(_) => HubError::delivery(conn, "connection closed"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ping(peer: &str) -> HubCallback {
        HubCallback::RemoveFromCall { peer: peer.into() }
    }

    #[tokio::test]
    async fn delivers_to_registered_connection() {
        let router = ConnectionRouter::new(4);
        let (id, mut rx) = router.register();

        router.send_to(&id, ping("x")).await.unwrap();
        assert_eq!(rx.recv().await, Some(ping("x")));
    }

    #[tokio::test]
    async fn full_queue_fails_only_that_recipient() {
        let router = ConnectionRouter::new(1);
        let (slow, _slow_rx) = router.register();
        let (fast, mut fast_rx) = router.register();

        router.send_to(&slow, ping("1")).await.unwrap();
        let failures = router.send_to_many(&[slow.clone(), fast.clone()], &ping("2")).await;

        assert_eq!(failures, vec![HubError::delivery(&slow, "outbound queue full")]);
        assert_eq!(fast_rx.recv().await, Some(ping("2")));
    }

    #[tokio::test]
    async fn unregistered_connection_is_a_delivery_failure() {
        let router = ConnectionRouter::default();
        let (id, _rx) = router.register();
        router.unregister(&id);

        let err = router.send_to(&id, ping("x")).await.unwrap_err();
        assert!(matches!(err, HubError::DeliveryFailure { .. }));
        assert_eq!(router.connection_count(), 0);
    }
}
