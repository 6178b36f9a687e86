use std::error::Error;
use std::time::Duration;

use libp2p::core::muxing::StreamMuxerBox;
use libp2p::core::transport::Boxed;
use libp2p::core::upgrade::Version;
use libp2p::{PeerId, Transport, identity, noise, tcp, yamux};

const UPGRADE_TIMEOUT: Duration = Duration::from_secs(20);

/// TCP + noise + yamux on the tokio runtime.
pub fn build_transport(
    local_key: &identity::Keypair,
) -> Result<Boxed<(PeerId, StreamMuxerBox)>, Box<dyn Error>> {
    let tcp_config = tcp::Config::default().nodelay(true);
    let noise_config = noise::Config::new(local_key)?;

    Ok(tcp::tokio::Transport::new(tcp_config)
        .upgrade(Version::V1)
        .authenticate(noise_config)
        .multiplex(yamux::Config::default())
        .timeout(UPGRADE_TIMEOUT)
        .boxed())
}
