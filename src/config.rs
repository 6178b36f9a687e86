use std::fs;
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config/chat.json";

/// Which message store backs the chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// In-process only; history is gone on exit.
    Memory,
    /// Persisted on this device.
    #[default]
    Sqlite,
    /// Persisted locally and gossiped to peers.
    Replicated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_local_storage_path")]
    pub local_storage_path: String,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Multiaddrs ending in `/p2p/<PeerId>`, dialed at startup.
    #[serde(default)]
    pub peers: Vec<String>,
    #[serde(default)]
    pub gossip: GossipSettings,
}

/// Tuning for the replicated backend's gossip topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GossipSettings {
    pub heartbeat_secs: u64,
    /// Largest frame gossipsub will transmit. Appends that cannot fit are
    /// rejected and history answers are split below it.
    pub max_frame_bytes: usize,
    /// Most messages in one history frame.
    pub history_batch: usize,
}

impl Default for GossipSettings {
    fn default() -> Self {
        Self {
            heartbeat_secs: 10,
            max_frame_bytes: 1 << 20,
            history_batch: 200,
        }
    }
}

fn default_database_path() -> String {
    "data/chat.db".to_string()
}

fn default_local_storage_path() -> String {
    "data/local.db".to_string()
}

fn default_topic() -> String {
    "community-chat".to_string()
}

fn default_listen_addr() -> String {
    "/ip4/0.0.0.0/tcp/0".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            database_path: default_database_path(),
            local_storage_path: default_local_storage_path(),
            topic: default_topic(),
            listen_addr: default_listen_addr(),
            peers: Vec::new(),
            gossip: GossipSettings::default(),
        }
    }
}

pub fn load_config(path: &str) -> AppConfig {
    let path = Path::new(path);
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse config file {}: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    }
}

pub fn save_config(path: &str, config: &AppConfig) -> std::io::Result<()> {
    crate::storage::ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"backend":"replicated","topic":"lobby"}"#).unwrap();

        assert_eq!(config.backend, StoreBackend::Replicated);
        assert_eq!(config.topic, "lobby");
        assert_eq!(config.database_path, "data/chat.db");
        assert_eq!(config.local_storage_path, "data/local.db");
        assert!(config.peers.is_empty());
        assert_eq!(config.gossip, GossipSettings::default());
    }

    #[test]
    fn gossip_settings_fill_missing_fields() {
        let config: AppConfig =
            serde_json::from_str(r#"{"gossip":{"max_frame_bytes":65536}}"#).unwrap();

        assert_eq!(config.gossip.max_frame_bytes, 65536);
        assert_eq!(config.gossip.history_batch, 200);
        assert_eq!(config.gossip.heartbeat_secs, 10);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config("does/not/exist.json");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.backend, StoreBackend::Sqlite);
    }

    #[test]
    fn saved_config_loads_back() {
        let path = std::env::temp_dir()
            .join(format!("community-chat-{}", uuid::Uuid::new_v4()))
            .join("chat.json");
        let path = path.to_string_lossy().into_owned();
        let config = AppConfig {
            backend: StoreBackend::Memory,
            peers: vec!["/ip4/10.0.0.2/tcp/4001/p2p/12D3KooWExample".to_string()],
            ..AppConfig::default()
        };

        save_config(&path, &config).unwrap();
        assert_eq!(load_config(&path), config);

        let _ = fs::remove_dir_all(Path::new(&path).parent().unwrap());
    }
}
