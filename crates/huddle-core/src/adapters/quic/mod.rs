//! QUIC transport for native clients.
//!
//! Each client opens one bidirectional stream. Both directions carry frames
//! of a 4-byte big-endian length followed by a CBOR-encoded message.

pub mod client;
pub mod server;

use quinn::{ReadExactError, RecvStream, SendStream};

use crate::domain::error::CodecError;

use super::MAX_FRAME_LEN;

/// Read one frame. `Ok(None)` means the peer finished the stream cleanly.
pub(crate) async fn read_frame(recv: &mut RecvStream) -> anyhow::Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match recv.read_exact(&mut len_buf).await {
        Ok(()) => {}
        Err(ReadExactError::FinishedEarly(0)) => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(CodecError::FrameTooLarge(len, MAX_FRAME_LEN).into());
    }

    let mut payload = vec![0u8; len];
    recv.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

pub(crate) async fn write_frame(send: &mut SendStream, payload: &[u8]) -> anyhow::Result<()> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(CodecError::FrameTooLarge(payload.len(), MAX_FRAME_LEN).into());
    }
    let len = (payload.len() as u32).to_be_bytes();
    send.write_all(&len).await?;
    send.write_all(payload).await?;
    Ok(())
}
