//! JoinChat use case.
//!
//! Introduces a newcomer to everyone already in the channel. The newcomer is
//! always the side that creates the WebRTC offer, which fixes the offer/answer
//! roles and avoids glare.

use std::sync::Arc;

use tracing::info;

use crate::domain::error::HubError;
use crate::domain::identity::{ChannelName, ConnectionId};
use crate::domain::signal::HubCallback;

use super::ports::ConnectionTransport;
use super::registry::ChannelRegistry;
use super::report_delivery_failures;

pub struct JoinChatUseCase {
    registry: Arc<ChannelRegistry>,
    transport: Arc<dyn ConnectionTransport>,
}

impl JoinChatUseCase {
    pub fn new(registry: Arc<ChannelRegistry>, transport: Arc<dyn ConnectionTransport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    /// Add `caller` to `channel`. Returns the members the caller was
    /// introduced to, in join order.
    ///
    /// 1. Existing members get `AddToCall(caller, false)`.
    /// 2. The caller gets `AddToCall(member, true)` for each of them.
    /// 3. The caller is appended.
    ///
    /// The channel stays locked throughout, so two concurrent joiners are
    /// always introduced to each other by whichever joins second.
    pub async fn execute(
        &self,
        channel: &ChannelName,
        caller: &ConnectionId,
    ) -> Result<Vec<ConnectionId>, HubError> {
        let mut guard = self.registry.ensure_channel(channel).await;
        if guard.contains(caller) {
            return Err(HubError::AlreadyAMember {
                channel: channel.clone(),
                connection: caller.clone(),
            });
        }

        let existing = guard.members().to_vec();

        let failures = self
            .transport
            .send_to_many_except(
                &existing,
                caller,
                &HubCallback::AddToCall {
                    peer: caller.clone(),
                    create_offer: false,
                },
            )
            .await;
        report_delivery_failures("AddToCall", channel, failures);

        for peer in &existing {
            let msg = HubCallback::AddToCall {
                peer: peer.clone(),
                create_offer: true,
            };
            if let Err(e) = self.transport.send_to(caller, msg).await {
                report_delivery_failures("AddToCall", channel, vec![e]);
            }
        }

        guard.add(caller)?;
        info!(%channel, %caller, peers = existing.len(), "Joined channel");
        Ok(existing)
    }
}
