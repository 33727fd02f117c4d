//! Disconnect use case: runs the LeaveChat teardown for every channel a
//! dropped connection was still in, without writing to the dropped side.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::error::HubError;
use crate::domain::identity::{ChannelName, ConnectionId};

use super::leave_chat::LeaveChatUseCase;
use super::registry::ChannelRegistry;

pub struct DisconnectUseCase {
    registry: Arc<ChannelRegistry>,
    leave: Arc<LeaveChatUseCase>,
}

impl DisconnectUseCase {
    pub fn new(registry: Arc<ChannelRegistry>, leave: Arc<LeaveChatUseCase>) -> Self {
        Self { registry, leave }
    }

    /// Returns the channels this call actually removed `conn` from.
    ///
    /// Works on a snapshot of the connection's channels. A channel that a
    /// concurrent LeaveChat already handled reports not-found or
    /// not-a-member and is skipped without notifying anyone twice.
    pub async fn execute(&self, conn: &ConnectionId) -> Vec<ChannelName> {
        let snapshot = self.registry.channels_containing(conn);
        let mut left = Vec::with_capacity(snapshot.len());

        for channel in snapshot {
            match self.leave.depart(&channel, conn).await {
                Ok(_) => left.push(channel),
                Err(e @ (HubError::ChannelNotFound(_) | HubError::NotAMember { .. })) => {
                    debug!(%conn, %channel, "Already gone during disconnect: {e}");
                }
                Err(e) => warn!(%conn, %channel, "Disconnect cleanup failed: {e}"),
            }
        }

        info!(%conn, channels = left.len(), "Connection cleaned up");
        left
    }
}
