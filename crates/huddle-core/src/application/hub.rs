//! SignallingHub: dispatches decoded client commands to the use cases.
//!
//! Nothing here reaches the client as an error: every failure is logged and
//! the command becomes a no-op.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::error::HubError;
use crate::domain::identity::{ChannelName, ConnectionId};
use crate::domain::signal::ClientCommand;

use super::disconnect::DisconnectUseCase;
use super::join_chat::JoinChatUseCase;
use super::leave_chat::LeaveChatUseCase;
use super::ports::ConnectionTransport;
use super::registry::ChannelRegistry;
use super::relay::RelayUseCase;

pub struct SignallingHub {
    registry: Arc<ChannelRegistry>,
    join: JoinChatUseCase,
    leave: Arc<LeaveChatUseCase>,
    relay: RelayUseCase,
    disconnect: DisconnectUseCase,
}

impl SignallingHub {
    pub fn new(registry: Arc<ChannelRegistry>, transport: Arc<dyn ConnectionTransport>) -> Self {
        let leave = Arc::new(LeaveChatUseCase::new(registry.clone(), transport.clone()));
        Self {
            join: JoinChatUseCase::new(registry.clone(), transport.clone()),
            relay: RelayUseCase::new(registry.clone(), transport),
            disconnect: DisconnectUseCase::new(registry.clone(), leave.clone()),
            leave,
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    /// Handle one command from `caller`.
    pub async fn dispatch(&self, caller: &ConnectionId, cmd: ClientCommand) {
        let kind = cmd.kind();
        let result = match cmd {
            ClientCommand::JoinChat { channel } => {
                self.join.execute(&channel, caller).await.map(|_| ())
            }
            ClientCommand::LeaveChat { channel } => {
                self.leave.execute(&channel, caller).await.map(|_| ())
            }
            ClientCommand::RelaySessionDescription {
                channel,
                peer,
                session_description,
            } => {
                self.relay
                    .relay_session_description(&channel, caller, &peer, session_description)
                    .await
            }
            ClientCommand::RelayIceCandidate {
                channel,
                peer,
                ice_candidate,
            } => {
                self.relay
                    .relay_ice_candidate(&channel, caller, &peer, ice_candidate)
                    .await
            }
        };

        match result {
            Ok(()) => {}
            Err(e @ HubError::DeliveryFailure { .. }) => {
                warn!(%caller, command = kind, "{e}");
            }
            Err(e) => debug!(%caller, command = kind, "Ignored: {e}"),
        }
    }

    /// The transport lost `caller`; leave every channel it was in.
    pub async fn disconnect(&self, caller: &ConnectionId) -> Vec<ChannelName> {
        self.disconnect.execute(caller).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::application::testing::{ch, conn, hub, remove};
    use crate::domain::signal::{HubCallback, Payload};

    fn join(channel: &str) -> ClientCommand {
        ClientCommand::JoinChat { channel: ch(channel) }
    }

    fn leave(channel: &str) -> ClientCommand {
        ClientCommand::LeaveChat { channel: ch(channel) }
    }

    fn ice(channel: &str, peer: &str) -> ClientCommand {
        ClientCommand::RelayIceCandidate {
            channel: ch(channel),
            peer: conn(peer),
            ice_candidate: Payload::Json(json!({ "candidate": "candidate:0 1 UDP 1 10.0.0.1 9 typ host" })),
        }
    }

    #[tokio::test]
    async fn leave_tears_down_both_directions() {
        let (hub, transport) = hub();
        for id in ["a", "b", "c"] {
            hub.dispatch(&conn(id), join("x")).await;
        }
        transport.take();

        hub.dispatch(&conn("b"), leave("x")).await;

        assert_eq!(
            transport.take(),
            vec![
                (conn("a"), remove("b")),
                (conn("c"), remove("b")),
                (conn("b"), remove("a")),
                (conn("b"), remove("c")),
            ]
        );
        assert_eq!(
            hub.registry().members_of(&ch("x")).await.unwrap(),
            vec![conn("a"), conn("c")]
        );
    }

    #[tokio::test]
    async fn leave_by_stranger_notifies_nobody() {
        let (hub, transport) = hub();
        hub.dispatch(&conn("a"), join("x")).await;
        hub.dispatch(&conn("z"), leave("x")).await;
        hub.dispatch(&conn("z"), leave("nowhere")).await;

        assert!(transport.take().is_empty());
        assert_eq!(hub.registry().members_of(&ch("x")).await.unwrap(), vec![conn("a")]);
    }

    #[tokio::test]
    async fn disconnect_removes_member_and_stops_relays() {
        let (hub, transport) = hub();
        for id in ["a", "b", "c"] {
            hub.dispatch(&conn(id), join("x")).await;
        }
        transport.take();
        transport.kill(&conn("b"));

        let left = hub.disconnect(&conn("b")).await;

        assert_eq!(left, vec![ch("x")]);
        assert_eq!(
            transport.take(),
            vec![(conn("a"), remove("b")), (conn("c"), remove("b"))]
        );
        assert_eq!(
            hub.registry().members_of(&ch("x")).await.unwrap(),
            vec![conn("a"), conn("c")]
        );

        hub.dispatch(&conn("a"), ice("x", "b")).await;
        assert!(transport.take().is_empty());
    }

    #[tokio::test]
    async fn disconnect_covers_every_channel_and_is_idempotent() {
        let (hub, transport) = hub();
        hub.dispatch(&conn("a"), join("x")).await;
        hub.dispatch(&conn("a"), join("y")).await;
        hub.dispatch(&conn("b"), join("y")).await;
        transport.take();

        assert_eq!(hub.disconnect(&conn("a")).await, vec![ch("x"), ch("y")]);
        assert_eq!(transport.take_for(&conn("b")), vec![remove("a")]);
        assert_eq!(hub.registry().channel_names(), vec![ch("y")]);

        assert!(hub.disconnect(&conn("a")).await.is_empty());
        assert!(transport.take().is_empty());
    }

    #[tokio::test]
    async fn lone_member_leaving_closes_channel_and_rejoin_starts_fresh() {
        let (hub, transport) = hub();
        hub.dispatch(&conn("a"), join("y")).await;
        hub.dispatch(&conn("a"), leave("y")).await;

        assert_eq!(hub.registry().channel_count(), 0);
        assert_eq!(
            hub.registry().members_of(&ch("y")).await.unwrap_err(),
            HubError::ChannelNotFound(ch("y"))
        );

        hub.dispatch(&conn("a"), join("y")).await;
        assert_eq!(hub.registry().members_of(&ch("y")).await.unwrap(), vec![conn("a")]);
        assert!(transport.take().is_empty());
    }

    #[tokio::test]
    async fn relays_are_tagged_with_the_sender() {
        let (hub, transport) = hub();
        hub.dispatch(&conn("a"), join("x")).await;
        hub.dispatch(&conn("b"), join("x")).await;
        transport.take();

        let offer = Payload::Json(json!({ "type": "offer", "sdp": "v=0\r\n" }));
        hub.dispatch(
            &conn("b"),
            ClientCommand::RelaySessionDescription {
                channel: ch("x"),
                peer: conn("a"),
                session_description: offer.clone(),
            },
        )
        .await;
        hub.dispatch(&conn("a"), ice("x", "b")).await;

        let sent = transport.take();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[0],
            (
                conn("a"),
                HubCallback::SessionDescription {
                    peer: conn("b"),
                    session_description: offer,
                }
            )
        );
        assert!(matches!(
            &sent[1],
            (to, HubCallback::IceCandidate { peer, .. }) if *to == conn("b") && *peer == conn("a")
        ));
    }

    #[tokio::test]
    async fn relay_outside_membership_is_dropped() {
        let (hub, transport) = hub();
        hub.dispatch(&conn("a"), join("x")).await;
        hub.dispatch(&conn("b"), join("other")).await;
        transport.take();

        hub.dispatch(&conn("a"), ice("x", "b")).await;
        hub.dispatch(&conn("a"), ice("missing", "b")).await;

        assert!(transport.take().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_introduce_every_pair_once() {
        const N: usize = 24;
        let (hub, transport) = hub();
        let hub = Arc::new(hub);

        let mut tasks = Vec::new();
        for i in 0..N {
            let hub = Arc::clone(&hub);
            tasks.push(tokio::spawn(async move {
                hub.dispatch(&conn(&format!("p{i}")), join("party")).await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(hub.registry().channel_count(), 1);
        assert_eq!(hub.registry().members_of(&ch("party")).await.unwrap().len(), N);

        let mut links = HashMap::new();
        for (to, msg) in transport.take() {
            match msg {
                HubCallback::AddToCall { peer, create_offer } => {
                    assert!(links.insert((to, peer), create_offer).is_none());
                }
                other => panic!("unexpected callback {other:?}"),
            }
        }
        assert_eq!(links.len(), N * (N - 1));
        for ((to, peer), offers) in &links {
            assert_eq!(links[&(peer.clone(), to.clone())], !offers);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_leave_and_disconnect_notify_once() {
        let (hub, transport) = hub();
        for id in ["a", "b", "c"] {
            hub.dispatch(&conn(id), join("x")).await;
        }
        transport.take();

        let hub = Arc::new(hub);
        let leaving = {
            let hub = Arc::clone(&hub);
            tokio::spawn(async move { hub.dispatch(&conn("b"), leave("x")).await })
        };
        let dropping = {
            let hub = Arc::clone(&hub);
            tokio::spawn(async move { hub.disconnect(&conn("b")).await })
        };
        leaving.await.unwrap();
        dropping.await.unwrap();

        let sent = transport.take();
        for id in ["a", "c"] {
            let got: Vec<_> = sent.iter().filter(|(to, _)| *to == conn(id)).collect();
            assert_eq!(got.len(), 1);
            assert_eq!(got[0].1, remove("b"));
        }
        assert_eq!(
            hub.registry().members_of(&ch("x")).await.unwrap(),
            vec![conn("a"), conn("c")]
        );
    }
}
