//! In-memory transport fake for use-case tests.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::error::HubError;
use crate::domain::identity::{ChannelName, ConnectionId};
use crate::domain::signal::HubCallback;

use super::hub::SignallingHub;
use super::ports::ConnectionTransport;
use super::registry::ChannelRegistry;

/// Records every delivery in order; connections marked dead refuse delivery.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(ConnectionId, HubCallback)>>,
    dead: Mutex<HashSet<ConnectionId>>,
}

impl RecordingTransport {
    pub fn kill(&self, conn: &ConnectionId) {
        self.dead.lock().insert(conn.clone());
    }

    /// Drain everything delivered so far.
    pub fn take(&self) -> Vec<(ConnectionId, HubCallback)> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Drain and keep only what `conn` received.
    pub fn take_for(&self, conn: &ConnectionId) -> Vec<HubCallback> {
        self.take()
            .into_iter()
            .filter(|(to, _)| to == conn)
            .map(|(_, msg)| msg)
            .collect()
    }
}

#[async_trait]
impl ConnectionTransport for RecordingTransport {
    async fn send_to(&self, conn: &ConnectionId, msg: HubCallback) -> Result<(), HubError> {
        if self.dead.lock().contains(conn) {
            return Err(HubError::delivery(conn, "connection closed"));
        }
        self.sent.lock().push((conn.clone(), msg));
        Ok(())
    }
}

pub fn hub() -> (SignallingHub, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::default());
    let hub = SignallingHub::new(Arc::new(ChannelRegistry::new()), transport.clone());
    (hub, transport)
}

pub fn conn(id: &str) -> ConnectionId {
    ConnectionId::from(id)
}

pub fn ch(name: &str) -> ChannelName {
    ChannelName::from(name)
}

pub fn add(peer: &str, create_offer: bool) -> HubCallback {
    HubCallback::AddToCall {
        peer: conn(peer),
        create_offer,
    }
}

pub fn remove(peer: &str) -> HubCallback {
    HubCallback::RemoveFromCall { peer: conn(peer) }
}
