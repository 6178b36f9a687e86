use std::error::Error;
use std::time::Duration;

use libp2p::gossipsub::{self, IdentTopic, MessageAuthenticity, MessageId, ValidationMode};
use libp2p::swarm::NetworkBehaviour;
use libp2p::{PeerId, identity, mdns};

use crate::config::GossipSettings;

#[derive(NetworkBehaviour)]
pub struct ChatBehavior {
    pub gossipsub: gossipsub::Behaviour,
    pub mdns: mdns::tokio::Behaviour,
}

/// Identifies a frame by its signed origin and sequence number, so a peer
/// may publish the same bytes twice (e.g. two identical sync requests).
/// Duplicate chat messages are dropped by the store, not here.
pub fn frame_id(message: &gossipsub::Message) -> MessageId {
    let source = message
        .source
        .map(|peer| peer.to_base58())
        .unwrap_or_default();
    let sequence = message.sequence_number.unwrap_or_default();
    MessageId::from(format!("{source}/{sequence}"))
}

/// Gossipsub on `topic_name` plus mDNS discovery of peers on the LAN.
pub fn build_behavior(
    local_key: &identity::Keypair,
    local_peer_id: PeerId,
    topic_name: &str,
    settings: &GossipSettings,
) -> Result<(ChatBehavior, IdentTopic), Box<dyn Error>> {
    let config = gossipsub::ConfigBuilder::default()
        .heartbeat_interval(Duration::from_secs(settings.heartbeat_secs))
        .validation_mode(ValidationMode::Strict)
        .max_transmit_size(settings.max_frame_bytes)
        .message_id_fn(frame_id)
        .build()?;

    let topic = IdentTopic::new(topic_name);
    let mut gossipsub =
        gossipsub::Behaviour::new(MessageAuthenticity::Signed(local_key.clone()), config)?;
    gossipsub.subscribe(&topic)?;

    let mdns = mdns::tokio::Behaviour::new(mdns::Config::default(), local_peer_id)?;
    log::debug!(
        "Gossip on {topic_name}: heartbeat {}s, frames up to {} bytes",
        settings.heartbeat_secs,
        settings.max_frame_bytes
    );

    Ok((ChatBehavior { gossipsub, mdns }, topic))
}
