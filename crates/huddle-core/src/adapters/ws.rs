//! axum WebSocket transport.
//!
//! One task per socket. Text frames carry JSON and binary frames carry CBOR;
//! callbacks go back in whichever encoding the client used last (JSON until
//! the client says otherwise). When the socket closes or errors the hub runs
//! disconnect cleanup for the connection.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::application::hub::SignallingHub;
use crate::application::ports::SignalCodec;
use crate::domain::error::CodecError;
use crate::domain::identity::ConnectionId;
use crate::domain::signal::{ClientCommand, HubCallback};

use super::codec::{CborSignalCodec, JsonSignalCodec};
use super::router::ConnectionRouter;
use super::MAX_FRAME_LEN;

/// Path the signalling socket is served on.
pub const SIGNAL_PATH: &str = "/signal";

/// Shared state handed to every socket task.
#[derive(Clone)]
pub struct SignalState {
    pub hub: Arc<SignallingHub>,
    pub connections: Arc<ConnectionRouter>,
}

pub fn routes() -> Router<SignalState> {
    Router::new().route(SIGNAL_PATH, get(signal_handler))
}

async fn signal_handler(ws: WebSocketUpgrade, State(state): State<SignalState>) -> Response {
    ws.max_message_size(MAX_FRAME_LEN)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Json,
    Cbor,
}

async fn handle_socket(socket: WebSocket, state: SignalState) {
    let (conn, mut outbound) = state.connections.register();
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut encoding = Encoding::Json;
    info!(%conn, "WebSocket session started");

    loop {
        tokio::select! {
            Some(msg) = outbound.recv() => {
                let frame = match encode(encoding, &msg) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(%conn, "Failed to encode callback: {e}");
                        continue;
                    }
                };
                if let Err(e) = ws_tx.send(frame).await {
                    debug!(%conn, "Socket write failed: {e}");
                    break;
                }
            }

            inbound = ws_rx.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    encoding = Encoding::Json;
                    handle_frame(&state.hub, &conn, JsonSignalCodec.decode(text.as_bytes())).await;
                }
                Some(Ok(Message::Binary(data))) => {
                    encoding = Encoding::Cbor;
                    handle_frame(&state.hub, &conn, CborSignalCodec.decode(&data)).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(%conn, "Socket read failed: {e}");
                    break;
                }
            },
        }
    }

    state.hub.disconnect(&conn).await;
    state.connections.unregister(&conn);
    info!(%conn, "WebSocket session ended");
}

async fn handle_frame(
    hub: &SignallingHub,
    conn: &ConnectionId,
    decoded: Result<ClientCommand, CodecError>,
) {
    match decoded {
        Ok(cmd) => hub.dispatch(conn, cmd).await,
        Err(e) => warn!(%conn, "Dropping undecodable frame: {e}"),
    }
}

fn encode(encoding: Encoding, msg: &HubCallback) -> Result<Message, CodecError> {
    Ok(match encoding {
        Encoding::Json => {
            let bytes = JsonSignalCodec.encode(msg)?;
            // serde_json only emits UTF-8
            Message::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        Encoding::Cbor => Message::Binary(CborSignalCodec.encode(msg)?),
    })
}
