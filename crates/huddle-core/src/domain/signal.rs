//! Signalling message types exchanged between clients and the hub.
//!
//! Pure data, no I/O. The same types are carried as JSON over WebSocket
//! text frames and as CBOR over binary WebSocket frames or QUIC streams.

use serde::{Deserialize, Deserializer, Serialize};

use super::identity::{ChannelName, ConnectionId};

// ---------------------------------------------------------------------------
// Opaque payload
// ---------------------------------------------------------------------------

/// Session description or ICE candidate, relayed verbatim between peers.
///
/// The hub never looks inside; shape validation is the clients' business.
/// Anything JSON can express is held as a JSON value. CBOR-only content
/// (byte strings, non-text map keys, non-finite floats) is kept as the
/// CBOR value it arrived as, so native peers get it back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Json(serde_json::Value),
    Cbor(serde_cbor::Value),
}

impl Payload {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Cbor(_) => None,
        }
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<serde_cbor::Value> for Payload {
    fn from(value: serde_cbor::Value) -> Self {
        match json_form(&value) {
            Some(json) => Self::Json(json),
            None => Self::Cbor(value),
        }
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_cbor::Value::deserialize(deserializer).map(Self::from)
    }
}

/// The JSON value equal to `value`, if JSON can hold it without loss.
fn json_form(value: &serde_cbor::Value) -> Option<serde_json::Value> {
    use serde_cbor::Value as Cbor;
    use serde_json::Value as Json;

    Some(match value {
        Cbor::Null => Json::Null,
        Cbor::Bool(b) => Json::Bool(*b),
        Cbor::Integer(i) => match i64::try_from(*i) {
            Ok(n) => Json::from(n),
            Err(_) => Json::from(u64::try_from(*i).ok()?),
        },
        Cbor::Float(f) => Json::Number(serde_json::Number::from_f64(*f)?),
        Cbor::Text(s) => Json::String(s.clone()),
        Cbor::Array(items) => Json::Array(items.iter().map(json_form).collect::<Option<_>>()?),
        Cbor::Map(entries) => Json::Object(
            entries
                .iter()
                .map(|(key, value)| match key {
                    Cbor::Text(key) => Some((key.clone(), json_form(value)?)),
                    _ => None,
                })
                .collect::<Option<_>>()?,
        ),
        _ => return None,
    })
}

// ---------------------------------------------------------------------------
// Client -> hub
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ClientCommand {
    JoinChat {
        channel: ChannelName,
    },
    LeaveChat {
        channel: ChannelName,
    },
    RelaySessionDescription {
        channel: ChannelName,
        /// Connection the description is addressed to.
        peer: ConnectionId,
        session_description: Payload,
    },
    RelayIceCandidate {
        channel: ChannelName,
        peer: ConnectionId,
        ice_candidate: Payload,
    },
}

impl ClientCommand {
    pub fn channel(&self) -> &ChannelName {
        match self {
            Self::JoinChat { channel }
            | Self::LeaveChat { channel }
            | Self::RelaySessionDescription { channel, .. }
            | Self::RelayIceCandidate { channel, .. } => channel,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinChat { .. } => "JoinChat",
            Self::LeaveChat { .. } => "LeaveChat",
            Self::RelaySessionDescription { .. } => "RelaySessionDescription",
            Self::RelayIceCandidate { .. } => "RelayIceCandidate",
        }
    }
}

// ---------------------------------------------------------------------------
// Hub -> client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum HubCallback {
    /// Add `peer` to the local connection set.
    AddToCall {
        peer: ConnectionId,
        /// True when the receiver must create the WebRTC offer toward `peer`.
        create_offer: bool,
    },
    /// Drop `peer` from the local connection set.
    RemoveFromCall {
        peer: ConnectionId,
    },
    SessionDescription {
        /// Connection that sent the description.
        peer: ConnectionId,
        session_description: Payload,
    },
    IceCandidate {
        peer: ConnectionId,
        ice_candidate: Payload,
    },
}
