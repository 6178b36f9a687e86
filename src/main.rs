mod avatar;
mod common;
mod config;
mod error;
mod identity;
mod network;
mod storage;
mod store;
mod ui;

use std::error::Error;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use libp2p::multiaddr::Protocol;
use libp2p::{Multiaddr, PeerId};
use tokio::sync::mpsc;

use config::{AppConfig, StoreBackend};
use identity::{IdentityProvider, LocalStorage, MemoryStorage};
use network::ReplicationClient;
use storage::LocalStorageDatabase;
use store::{MemoryMessageStore, MessageStore, ReplicatedMessageStore, SqliteMessageStore};
use ui::ChatApp;

#[derive(Parser)]
#[command(
    name = "community-chat",
    version,
    about = "Real-time community chat room"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    /// Override the message store from the config file
    #[arg(long, value_enum)]
    backend: Option<StoreBackend>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Write a config file with default settings and exit
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if cli.command == Some(Command::InitConfig) {
        config::save_config(&cli.config, &AppConfig::default())?;
        log::info!("Wrote default config to {}", cli.config);
        return Ok(());
    }

    let mut app_config = config::load_config(&cli.config);
    if let Some(backend) = cli.backend {
        app_config.backend = backend;
    }

    let store = open_store(&app_config)?;
    let identity = IdentityProvider::new(open_local_storage(&app_config.local_storage_path));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([800.0, 720.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Community Chat",
        options,
        Box::new(move |cc| {
            log::info!("Chat started with the {:?} store", app_config.backend);
            Ok(Box::new(ChatApp::new(cc, store, &identity)))
        }),
    )?;

    Ok(())
}

fn open_store(config: &AppConfig) -> Result<Arc<dyn MessageStore>, Box<dyn Error>> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryMessageStore::new())),
        StoreBackend::Sqlite => {
            storage::ensure_parent_dir(&config.database_path)?;
            Ok(Arc::new(SqliteMessageStore::open(&config.database_path)?))
        }
        StoreBackend::Replicated => {
            storage::ensure_parent_dir(&config.database_path)?;
            let local = SqliteMessageStore::open(&config.database_path)?;
            let listen_addr: Multiaddr = config.listen_addr.parse()?;
            let peers = parse_peers(&config.peers);

            let (cmd_tx, cmd_rx) = mpsc::channel(100);
            let client = ReplicationClient::new(
                local.clone(),
                cmd_rx,
                peers,
                listen_addr,
                config.topic.clone(),
                config.gossip.clone(),
            );
            tokio::spawn(async move {
                if let Err(err) = client.run().await {
                    log::error!("Replication task terminated: {err}");
                }
            });

            Ok(Arc::new(ReplicatedMessageStore::new(
                local,
                cmd_tx,
                config.gossip.max_frame_bytes,
            )))
        }
    }
}

/// Device-local storage for the display name. Falls back to memory so a
/// broken file never blocks the chat.
fn open_local_storage(path: &str) -> Box<dyn LocalStorage> {
    let opened = storage::ensure_parent_dir(path)
        .map_err(error::ChatError::from)
        .and_then(|()| LocalStorageDatabase::with_path(path).map_err(error::ChatError::from));
    match opened {
        Ok(db) => Box::new(db),
        Err(err) => {
            log::warn!("Local storage {path} unavailable ({err}); display name will not persist");
            Box::new(MemoryStorage::default())
        }
    }
}

fn parse_peers(entries: &[String]) -> Vec<(PeerId, Multiaddr)> {
    entries
        .iter()
        .filter_map(|entry| {
            let mut addr: Multiaddr = match entry.parse() {
                Ok(addr) => addr,
                Err(err) => {
                    log::warn!("Invalid multiaddr `{entry}`: {err}");
                    return None;
                }
            };

            let peer_id = match addr.pop() {
                Some(Protocol::P2p(peer)) => peer,
                _ => {
                    log::warn!("Multiaddr `{entry}` missing /p2p/PeerId suffix");
                    return None;
                }
            };

            Some((peer_id, addr))
        })
        .collect()
}
