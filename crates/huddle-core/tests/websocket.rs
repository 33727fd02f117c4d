//! Loopback tests for the WebSocket transport.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use huddle_core::adapters::codec::CborSignalCodec;
use huddle_core::adapters::http::{self, HttpOptions};
use huddle_core::adapters::router::ConnectionRouter;
use huddle_core::adapters::ws::SignalState;
use huddle_core::application::hub::SignallingHub;
use huddle_core::application::ports::SignalCodec;
use huddle_core::application::registry::ChannelRegistry;
use huddle_core::domain::identity::{ChannelName, ConnectionId};
use huddle_core::domain::signal::{ClientCommand, HubCallback};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const STEP: Duration = Duration::from_secs(5);

async fn start() -> (SocketAddr, Arc<SignallingHub>, oneshot::Sender<()>) {
    let connections = Arc::new(ConnectionRouter::default());
    let hub = Arc::new(SignallingHub::new(
        Arc::new(ChannelRegistry::new()),
        connections.clone(),
    ));
    let app = http::app(
        SignalState {
            hub: hub.clone(),
            connections,
        },
        &HttpOptions::default(),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    tokio::spawn(http::serve(listener, app, async move {
        stop_rx.await.ok();
    }));
    (addr, hub, stop_tx)
}

async fn connect(addr: SocketAddr) -> Socket {
    let (socket, _) = connect_async(format!("ws://{addr}/signal")).await.unwrap();
    socket
}

async fn send_json(socket: &mut Socket, value: Value) {
    socket.send(Message::Text(value.to_string())).await.unwrap();
}

async fn next_json(socket: &mut Socket) -> Value {
    loop {
        let msg = tokio::time::timeout(STEP, socket.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn wait_for_members(hub: &SignallingHub, channel: &str, count: usize) -> Vec<ConnectionId> {
    let channel = ChannelName::from(channel);
    tokio::time::timeout(STEP, async {
        loop {
            if let Ok(members) = hub.registry().members_of(&channel).await {
                if members.len() == count {
                    return members;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("membership never settled")
}

#[tokio::test]
async fn browser_call_setup_and_teardown() {
    let (addr, hub, _stop) = start().await;

    let mut alice = connect(addr).await;
    send_json(&mut alice, json!({ "type": "JoinChat", "channel": "lobby" })).await;
    let alice_id = wait_for_members(&hub, "lobby", 1).await.remove(0);

    let mut bob = connect(addr).await;
    send_json(&mut bob, json!({ "type": "JoinChat", "channel": "lobby" })).await;

    let to_bob = next_json(&mut bob).await;
    assert_eq!(
        to_bob,
        json!({ "type": "AddToCall", "peer": alice_id.as_str(), "createOffer": true })
    );
    let to_alice = next_json(&mut alice).await;
    assert_eq!(to_alice["type"], "AddToCall");
    assert_eq!(to_alice["createOffer"], false);
    let bob_id = to_alice["peer"].as_str().unwrap().to_owned();

    let offer = json!({ "type": "offer", "sdp": "v=0\r\n" });
    send_json(
        &mut bob,
        json!({
            "type": "RelaySessionDescription",
            "channel": "lobby",
            "peer": alice_id.as_str(),
            "sessionDescription": offer,
        }),
    )
    .await;
    assert_eq!(
        next_json(&mut alice).await,
        json!({ "type": "SessionDescription", "peer": bob_id, "sessionDescription": offer })
    );

    bob.close(None).await.unwrap();
    assert_eq!(
        next_json(&mut alice).await,
        json!({ "type": "RemoveFromCall", "peer": bob_id })
    );
    assert_eq!(wait_for_members(&hub, "lobby", 1).await, vec![alice_id]);
}

#[tokio::test]
async fn garbage_frames_do_not_end_the_session() {
    let (addr, hub, _stop) = start().await;

    let mut client = connect(addr).await;
    client.send(Message::Text("{ definitely not json".into())).await.unwrap();
    send_json(&mut client, json!({ "type": "JoinChat", "channel": "still-here" })).await;

    assert_eq!(wait_for_members(&hub, "still-here", 1).await.len(), 1);
}

#[tokio::test]
async fn binary_clients_get_cbor_back() {
    let (addr, hub, _stop) = start().await;
    let codec = CborSignalCodec;

    let mut native = connect(addr).await;
    let join = ClientCommand::JoinChat {
        channel: "mixed".into(),
    };
    native
        .send(Message::Binary(codec.encode(&join).unwrap()))
        .await
        .unwrap();
    let native_id = wait_for_members(&hub, "mixed", 1).await.remove(0);

    let mut browser = connect(addr).await;
    send_json(&mut browser, json!({ "type": "JoinChat", "channel": "mixed" })).await;
    let browser_id = wait_for_members(&hub, "mixed", 2).await.remove(1);

    let frame = tokio::time::timeout(STEP, native.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let Message::Binary(bytes) = frame else {
        panic!("expected a binary frame, got {frame:?}");
    };
    let callback: HubCallback = codec.decode(&bytes).unwrap();
    assert_eq!(
        callback,
        HubCallback::AddToCall {
            peer: browser_id,
            create_offer: false,
        }
    );

    let to_browser = next_json(&mut browser).await;
    assert_eq!(to_browser["peer"], native_id.as_str());
}
