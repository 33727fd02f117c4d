//! [`SignalCodec`] implementations.
//!
//! Browsers speak JSON over WebSocket text frames; native clients use CBOR
//! (binary WebSocket frames or QUIC streams).

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::application::ports::SignalCodec;
use crate::domain::error::CodecError;

/// JSON via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSignalCodec;

impl SignalCodec for JsonSignalCodec {
    fn encode<T: Serialize>(&self, msg: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(msg).map_err(Into::into)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(data).map_err(Into::into)
    }
}

/// CBOR via `serde_cbor`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CborSignalCodec;

impl SignalCodec for CborSignalCodec {
    fn encode<T: Serialize>(&self, msg: &T) -> Result<Vec<u8>, CodecError> {
        serde_cbor::to_vec(msg).map_err(Into::into)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError> {
        serde_cbor::from_slice(data).map_err(Into::into)
    }
}
