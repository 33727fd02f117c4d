//! Failure taxonomy for hub operations.
//!
//! None of these reach the client: the wire protocol has no error channel, so
//! the hub logs them and carries on.

use super::identity::{ChannelName, ConnectionId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    #[error("channel {0} not found")]
    ChannelNotFound(ChannelName),
    #[error("{connection} is not a member of {channel}")]
    NotAMember {
        channel: ChannelName,
        connection: ConnectionId,
    },
    #[error("{connection} is already a member of {channel}")]
    AlreadyAMember {
        channel: ChannelName,
        connection: ConnectionId,
    },
    #[error("delivery to {connection} failed: {reason}")]
    DeliveryFailure {
        connection: ConnectionId,
        reason: String,
    },
}

impl HubError {
    pub fn delivery(connection: &ConnectionId, reason: impl Into<String>) -> Self {
        Self::DeliveryFailure {
            connection: connection.clone(),
            reason: reason.into(),
        }
    }
}

/// Inbound or outbound frame could not be (de)serialized.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cbor: {0}")]
    Cbor(#[from] serde_cbor::Error),
    #[error("frame of {0} bytes exceeds the {1} byte limit")]
    FrameTooLarge(usize, usize),
}
