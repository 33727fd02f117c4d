pub mod codec;
pub mod http;
pub mod quic;
pub mod router;
pub mod ws;

/// Largest signalling frame accepted on any transport. SDP blobs for a
/// handful of tracks stay well under this.
pub const MAX_FRAME_LEN: usize = 256 * 1024;
