//! LeaveChat use case: symmetric teardown of a member's peer links.

use std::sync::Arc;

use tracing::info;

use crate::domain::error::HubError;
use crate::domain::identity::{ChannelName, ConnectionId};
use crate::domain::signal::HubCallback;

use super::ports::ConnectionTransport;
use super::registry::ChannelRegistry;
use super::report_delivery_failures;

pub struct LeaveChatUseCase {
    registry: Arc<ChannelRegistry>,
    transport: Arc<dyn ConnectionTransport>,
}

impl LeaveChatUseCase {
    pub fn new(registry: Arc<ChannelRegistry>, transport: Arc<dyn ConnectionTransport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    /// Remove `caller` from `channel`. Returns the members still in it.
    ///
    /// Every remaining member drops the leaver and the leaver drops every
    /// remaining member. A leaver who was alone closes the channel and
    /// nobody is notified.
    pub async fn execute(
        &self,
        channel: &ChannelName,
        caller: &ConnectionId,
    ) -> Result<Vec<ConnectionId>, HubError> {
        self.leave(channel, caller, true).await
    }

    /// Remove a connection whose transport is already gone. Remaining members
    /// are told as usual; nothing is queued for the departed connection.
    pub async fn depart(
        &self,
        channel: &ChannelName,
        conn: &ConnectionId,
    ) -> Result<Vec<ConnectionId>, HubError> {
        self.leave(channel, conn, false).await
    }

    async fn leave(
        &self,
        channel: &ChannelName,
        caller: &ConnectionId,
        notify_caller: bool,
    ) -> Result<Vec<ConnectionId>, HubError> {
        let mut guard = self
            .registry
            .open(channel)
            .await
            .ok_or_else(|| HubError::ChannelNotFound(channel.clone()))?;

        let remaining = guard.remove(caller)?;
        if remaining.is_empty() {
            info!(%channel, %caller, "Last member left, channel closed");
            return Ok(remaining);
        }

        let failures = self
            .transport
            .send_to_many(
                &remaining,
                &HubCallback::RemoveFromCall {
                    peer: caller.clone(),
                },
            )
            .await;
        report_delivery_failures("RemoveFromCall", channel, failures);

        if notify_caller {
            for peer in &remaining {
                let msg = HubCallback::RemoveFromCall { peer: peer.clone() };
                if let Err(e) = self.transport.send_to(caller, msg).await {
                    report_delivery_failures("RemoveFromCall", channel, vec![e]);
                }
            }
        }

        drop(guard);
        info!(%channel, %caller, remaining = remaining.len(), "Left channel");
        Ok(remaining)
    }
}
