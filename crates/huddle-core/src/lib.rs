//! huddle-core: channel registry and WebRTC signalling relay.
//!
//! # Architecture (Clean Architecture)
//!
//! - **domain**: identifiers, channel value type, wire messages, errors (no I/O).
//! - **application**: channel registry, port traits, one use case per hub
//!   operation and the [`SignallingHub`](application::hub::SignallingHub)
//!   facade that dispatches client commands.
//! - **adapters**: connection router, JSON/CBOR codecs, WebSocket (axum) and
//!   QUIC (Quinn) transports, HTTP extras.

pub mod adapters;
pub mod application;
pub mod domain;
