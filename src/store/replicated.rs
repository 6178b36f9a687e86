use chrono::Utc;
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::common::{NetworkCommand, NewMessage, Order};
use crate::error::{ChatError, Result};
use crate::network::sync;

use super::hub::SnapshotCallback;
use super::sqlite::SqliteMessageStore;
use super::{MessageStore, Subscription};

/// Local SQLite collection whose appends are also gossiped to peers.
/// Messages from peers are ingested by the network task.
#[derive(Clone)]
pub struct ReplicatedMessageStore {
    local: SqliteMessageStore,
    commands: mpsc::Sender<NetworkCommand>,
    max_frame_bytes: usize,
}

impl ReplicatedMessageStore {
    pub fn new(
        local: SqliteMessageStore,
        commands: mpsc::Sender<NetworkCommand>,
        max_frame_bytes: usize,
    ) -> Self {
        Self {
            local,
            commands,
            max_frame_bytes,
        }
    }
}

impl MessageStore for ReplicatedMessageStore {
    /// The message is kept locally even when the network task is gone;
    /// only the broadcast is reported as failed. Messages too large to
    /// gossip are rejected before they are stored.
    fn append(&self, message: NewMessage) -> BoxFuture<'static, Result<()>> {
        let local = self.local.clone();
        let commands = self.commands.clone();
        let max_frame_bytes = self.max_frame_bytes;
        async move {
            let draft = message
                .clone()
                .into_message(Uuid::nil().to_string(), Utc::now());
            if !sync::fits_in_frame(&draft, max_frame_bytes) {
                return Err(ChatError::Rejected(format!(
                    "message of {} bytes is too large to share",
                    message.text.len()
                )));
            }

            let message = tokio::task::spawn_blocking(move || local.record(message)).await??;
            commands
                .send(NetworkCommand::Publish(message))
                .await
                .map_err(|_| ChatError::Closed)
        }
        .boxed()
    }

    fn subscribe(&self, order: Order, on_change: SnapshotCallback) -> Subscription {
        self.local.subscribe(order, on_change)
    }
}
