use futures::StreamExt;
use libp2p::gossipsub;
use libp2p::swarm::{Config as SwarmConfig, SwarmEvent};
use libp2p::{Multiaddr, PeerId, Swarm, identity, mdns};
use tokio::sync::mpsc;

use crate::common::NetworkCommand;
use crate::config::GossipSettings;
use crate::error::{ChatError, Result};
use crate::store::SqliteMessageStore;

use super::behavior::{ChatBehavior, ChatBehaviorEvent, build_behavior};
use super::sync;
use super::transport::build_transport;
use super::wire::WireFrame;

/// Owns the swarm: broadcasts local appends and feeds peer messages into
/// the local store.
pub struct ReplicationClient {
    replica: Replica,
    command_receiver: mpsc::Receiver<NetworkCommand>,
    peers: Vec<(PeerId, Multiaddr)>,
    listen_addr: Multiaddr,
    topic_name: String,
    settings: GossipSettings,
}

/// Frame handling against the local store. Runs on blocking threads.
#[derive(Clone)]
pub struct Replica {
    store: SqliteMessageStore,
    history_batch: usize,
    max_frame_bytes: usize,
}

fn network_error(err: impl std::fmt::Display) -> ChatError {
    ChatError::Network(err.to_string())
}

impl ReplicationClient {
    pub fn new(
        store: SqliteMessageStore,
        command_receiver: mpsc::Receiver<NetworkCommand>,
        peers: Vec<(PeerId, Multiaddr)>,
        listen_addr: Multiaddr,
        topic_name: String,
        settings: GossipSettings,
    ) -> Self {
        Self {
            replica: Replica::new(store, &settings),
            command_receiver,
            peers,
            listen_addr,
            topic_name,
            settings,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let local_key = identity::Keypair::generate_ed25519();
        let local_peer_id = PeerId::from(local_key.public());
        log::info!("Local PeerID: {local_peer_id:?}");

        let transport = build_transport(&local_key).map_err(network_error)?;
        let (behavior, topic) =
            build_behavior(&local_key, local_peer_id, &self.topic_name, &self.settings)
                .map_err(network_error)?;

        let mut swarm = Swarm::new(
            transport,
            behavior,
            local_peer_id,
            SwarmConfig::with_tokio_executor(),
        );

        swarm
            .listen_on(self.listen_addr.clone())
            .map_err(network_error)?;

        for (peer_id, addr) in std::mem::take(&mut self.peers) {
            log::info!("Dialing configured peer {peer_id} at {addr}");
            swarm.behaviour_mut().gossipsub.add_explicit_peer(&peer_id);
            if let Err(err) = swarm.dial(addr) {
                log::warn!("Failed to dial peer {peer_id}: {err}");
            }
        }

        log::info!("Replication loop started on topic {}", self.topic_name);

        loop {
            tokio::select! {
                command = self.command_receiver.recv() => {
                    match command {
                        Some(command) => self.handle_command(command, &mut swarm, &topic),
                        None => break,
                    }
                }
                event = swarm.select_next_some() => {
                    self.handle_swarm_event(event, &mut swarm, &topic).await;
                }
            }
        }

        log::info!("Replication loop stopped");
        Ok(())
    }

    fn handle_command(
        &self,
        command: NetworkCommand,
        swarm: &mut Swarm<ChatBehavior>,
        topic: &gossipsub::IdentTopic,
    ) {
        match command {
            NetworkCommand::Publish(message) => {
                publish(swarm, topic, &WireFrame::Message(message));
            }
        }
    }

    async fn handle_swarm_event(
        &self,
        event: SwarmEvent<ChatBehaviorEvent>,
        swarm: &mut Swarm<ChatBehavior>,
        topic: &gossipsub::IdentTopic,
    ) {
        match event {
            SwarmEvent::Behaviour(ChatBehaviorEvent::Gossipsub(gossipsub::Event::Message {
                propagation_source,
                message,
                ..
            })) => match WireFrame::decode(&message.data) {
                Ok(frame) => {
                    let replica = self.replica.clone();
                    match tokio::task::spawn_blocking(move || replica.apply_frame(frame)).await {
                        Ok(replies) => {
                            for reply in &replies {
                                publish(swarm, topic, reply);
                            }
                        }
                        Err(err) => log::error!("Frame handler failed: {err}"),
                    }
                }
                Err(err) => {
                    log::warn!("Dropping malformed frame from {propagation_source}: {err}");
                }
            },
            SwarmEvent::Behaviour(ChatBehaviorEvent::Gossipsub(
                gossipsub::Event::Subscribed {
                    peer_id,
                    topic: subscribed,
                },
            )) if subscribed == topic.hash() => {
                log::info!("Peer {peer_id} joined the chat; requesting history");
                let replica = self.replica.clone();
                match tokio::task::spawn_blocking(move || replica.sync_request()).await {
                    Ok(request) => publish(swarm, topic, &request),
                    Err(err) => log::error!("Failed to build sync request: {err}"),
                }
            }
            SwarmEvent::Behaviour(ChatBehaviorEvent::Mdns(mdns::Event::Discovered(list))) => {
                for (peer_id, _) in list {
                    swarm.behaviour_mut().gossipsub.add_explicit_peer(&peer_id);
                }
            }
            SwarmEvent::Behaviour(ChatBehaviorEvent::Mdns(mdns::Event::Expired(list))) => {
                for (peer_id, _) in list {
                    swarm
                        .behaviour_mut()
                        .gossipsub
                        .remove_explicit_peer(&peer_id);
                }
            }
            SwarmEvent::NewListenAddr { address, .. } => {
                log::info!("Listening on {address:?}");
            }
            _ => {}
        }
    }
}

impl Replica {
    pub fn new(store: SqliteMessageStore, settings: &GossipSettings) -> Self {
        Self {
            store,
            history_batch: settings.history_batch,
            max_frame_bytes: settings.max_frame_bytes,
        }
    }

    /// Applies a frame from a peer, returning the frames to broadcast back.
    pub fn apply_frame(&self, frame: WireFrame) -> Vec<WireFrame> {
        match frame {
            WireFrame::Message(message) => {
                if let Err(err) = self.store.ingest(&message) {
                    log::error!("Failed to store message {}: {err}", message.id);
                }
                Vec::new()
            }
            WireFrame::History { messages } => {
                let mut added = 0;
                for message in &messages {
                    match self.store.ingest(message) {
                        Ok(true) => added += 1,
                        Ok(false) => {}
                        Err(err) => log::error!("Failed to store message {}: {err}", message.id),
                    }
                }
                log::debug!("Synced {added} of {} messages", messages.len());
                Vec::new()
            }
            WireFrame::SyncRequest { buckets } => match self.store.snapshot() {
                Ok(local) => {
                    let missing = sync::missing_from(local, &buckets);
                    if !missing.is_empty() {
                        log::debug!("Answering sync request with {} messages", missing.len());
                    }
                    sync::pack_history(missing, self.history_batch, self.max_frame_bytes)
                }
                Err(err) => {
                    log::error!("Failed to read history for sync: {err}");
                    Vec::new()
                }
            },
        }
    }

    /// Digest of everything stored locally. An unreadable store asks for
    /// the full history.
    pub fn sync_request(&self) -> WireFrame {
        let buckets = match self.store.snapshot() {
            Ok(local) => sync::summarize(&local),
            Err(err) => {
                log::warn!("Failed to read local history; requesting all of it: {err}");
                Vec::new()
            }
        };
        WireFrame::SyncRequest { buckets }
    }
}

fn publish(swarm: &mut Swarm<ChatBehavior>, topic: &gossipsub::IdentTopic, frame: &WireFrame) {
    match frame.encode() {
        Ok(bytes) => {
            if let Err(err) = swarm.behaviour_mut().gossipsub.publish(topic.clone(), bytes) {
                log::warn!("Publish error: {err:?}");
            }
        }
        Err(err) => log::warn!("Failed to serialize frame: {err:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ChatMessage, NewMessage};
    use chrono::DateTime;

    fn replica(store: SqliteMessageStore) -> Replica {
        Replica::new(store, &GossipSettings::default())
    }

    fn remote(id: &str, micros: Option<i64>) -> ChatMessage {
        let mut message = NewMessage::new(format!("remote {id}"), "FriendlyDolphin77")
            .into_message(id.to_string(), chrono::Utc::now());
        message.timestamp = micros.and_then(DateTime::from_timestamp_micros);
        message
    }

    fn seeded(entries: &[(&str, Option<i64>)]) -> SqliteMessageStore {
        let store = SqliteMessageStore::in_memory().unwrap();
        for (id, micros) in entries {
            store.ingest(&remote(id, *micros)).unwrap();
        }
        store
    }

    fn ids(store: &SqliteMessageStore) -> Vec<String> {
        store.snapshot().unwrap().into_iter().map(|m| m.id).collect()
    }

    /// One exchange in each direction, as happens when two peers subscribe.
    fn exchange(a: &Replica, b: &Replica) {
        let from_a = a.sync_request();
        let from_b = b.sync_request();
        for reply in b.apply_frame(from_a) {
            a.apply_frame(reply);
        }
        for reply in a.apply_frame(from_b) {
            b.apply_frame(reply);
        }
    }

    #[test]
    fn ingests_messages_and_history() {
        let store = SqliteMessageStore::in_memory().unwrap();
        let replica = replica(store.clone());

        assert!(replica.apply_frame(WireFrame::Message(remote("b", Some(20)))).is_empty());
        let history = WireFrame::History {
            messages: vec![remote("a", Some(10)), remote("b", Some(20))],
        };
        assert!(replica.apply_frame(history).is_empty());

        assert_eq!(ids(&store), ["a", "b"]);
    }

    #[test]
    fn partitioned_peers_converge_on_older_messages() {
        let a_store = seeded(&[("a1", Some(10)), ("a2", Some(30))]);
        let b_store = seeded(&[("b1", Some(20))]);
        let (a, b) = (replica(a_store.clone()), replica(b_store.clone()));

        exchange(&a, &b);

        assert_eq!(ids(&a_store), ["a1", "b1", "a2"]);
        assert_eq!(ids(&b_store), ["a1", "b1", "a2"]);
    }

    #[test]
    fn pending_messages_are_synced() {
        let a_store = seeded(&[("stamped", Some(10)), ("pending", None)]);
        let b_store = SqliteMessageStore::in_memory().unwrap();
        let (a, b) = (replica(a_store), replica(b_store.clone()));

        exchange(&a, &b);

        assert_eq!(ids(&b_store), ["stamped", "pending"]);
    }

    #[test]
    fn replicas_in_sync_send_nothing() {
        let entries = [("a", Some(10)), ("b", Some(20))];
        let a = replica(seeded(&entries));
        let b = replica(seeded(&entries));

        assert!(b.apply_frame(a.sync_request()).is_empty());
    }

    #[test]
    fn large_history_arrives_in_several_frames() {
        let text = "z".repeat(6 * 1024);
        let source = SqliteMessageStore::in_memory().unwrap();
        for n in 0..200 {
            let message = NewMessage::new(text.clone(), "LoudParrot5").into_message(
                format!("m{n:03}"),
                DateTime::from_timestamp_micros(n).unwrap(),
            );
            source.ingest(&message).unwrap();
        }
        let settings = GossipSettings::default();
        let target = SqliteMessageStore::in_memory().unwrap();

        let replies = replica(source).apply_frame(replica(target.clone()).sync_request());

        assert!(replies.len() > 1);
        for reply in &replies {
            assert!(reply.encode().unwrap().len() <= settings.max_frame_bytes);
        }
        let joiner = replica(target.clone());
        for reply in replies {
            joiner.apply_frame(reply);
        }
        assert_eq!(target.snapshot().unwrap().len(), 200);
    }
}
