//! Relay use case: forwards negotiation payloads between two members.

use std::sync::Arc;

use tracing::debug;

use crate::domain::error::HubError;
use crate::domain::identity::{ChannelName, ConnectionId};
use crate::domain::signal::{HubCallback, Payload};

use super::ports::ConnectionTransport;
use super::registry::ChannelRegistry;

/// Unicasts session descriptions and ICE candidates to a channel member,
/// tagged with the sender's connection id.
pub struct RelayUseCase {
    registry: Arc<ChannelRegistry>,
    transport: Arc<dyn ConnectionTransport>,
}

impl RelayUseCase {
    pub fn new(registry: Arc<ChannelRegistry>, transport: Arc<dyn ConnectionTransport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    pub async fn relay_session_description(
        &self,
        channel: &ChannelName,
        sender: &ConnectionId,
        target: &ConnectionId,
        session_description: Payload,
    ) -> Result<(), HubError> {
        let msg = HubCallback::SessionDescription {
            peer: sender.clone(),
            session_description,
        };
        self.relay(channel, target, msg).await
    }

    pub async fn relay_ice_candidate(
        &self,
        channel: &ChannelName,
        sender: &ConnectionId,
        target: &ConnectionId,
        ice_candidate: Payload,
    ) -> Result<(), HubError> {
        let msg = HubCallback::IceCandidate {
            peer: sender.clone(),
            ice_candidate,
        };
        self.relay(channel, target, msg).await
    }

    /// Deliver only while `target` is a member. The channel lock is held
    /// across the send so a concurrent leave cannot slip in between the
    /// check and the delivery.
    async fn relay(
        &self,
        channel: &ChannelName,
        target: &ConnectionId,
        msg: HubCallback,
    ) -> Result<(), HubError> {
        let guard = self
            .registry
            .open(channel)
            .await
            .ok_or_else(|| HubError::ChannelNotFound(channel.clone()))?;

        if !guard.contains(target) {
            return Err(HubError::NotAMember {
                channel: channel.clone(),
                connection: target.clone(),
            });
        }

        self.transport.send_to(target, msg).await?;
        debug!(%channel, %target, "Relayed signal");
        Ok(())
    }
}
