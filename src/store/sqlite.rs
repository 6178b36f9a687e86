use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::FutureExt;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::common::{ChatMessage, NewMessage, Order};
use crate::error::Result;
use crate::storage::MessageDatabase;

use super::clock::WriteClock;
use super::hub::{SnapshotCallback, SnapshotHub};
use super::{MessageStore, Subscription};

struct State {
    db: MessageDatabase,
    clock: WriteClock,
}

/// Store persisted in a SQLite file on this device.
#[derive(Clone)]
pub struct SqliteMessageStore {
    state: Arc<Mutex<State>>,
    hub: Arc<SnapshotHub>,
}

impl SqliteMessageStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_db(MessageDatabase::with_path(path)?)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        Self::from_db(MessageDatabase::in_memory()?)
    }

    fn from_db(db: MessageDatabase) -> Result<Self> {
        let clock = WriteClock::starting_after(db.latest_timestamp()?);
        log::info!("Message store opened with {} messages", db.message_count()?);
        Ok(Self {
            state: Arc::new(Mutex::new(State { db, clock })),
            hub: Arc::new(SnapshotHub::default()),
        })
    }

    /// Assigns id and timestamp, inserts and notifies subscribers.
    pub fn record(&self, message: NewMessage) -> Result<ChatMessage> {
        let mut state = self.lock();
        let timestamp = state.clock.stamp();
        let message = message.into_message(Uuid::new_v4().to_string(), timestamp);
        state.db.insert_message(&message)?;
        self.publish(&state);
        Ok(message)
    }

    /// Stores a message that already has an id (e.g. from a peer).
    /// Subscribers hear about it only when it was not stored before.
    pub fn ingest(&self, message: &ChatMessage) -> Result<bool> {
        let state = self.lock();
        let inserted = state.db.insert_message(message)?;
        if inserted {
            self.publish(&state);
        }
        Ok(inserted)
    }

    pub fn snapshot(&self) -> Result<Vec<ChatMessage>> {
        Ok(self.lock().db.all_messages()?)
    }

    fn publish(&self, state: &State) {
        match state.db.all_messages() {
            Ok(messages) => self.hub.publish(&messages),
            Err(err) => log::error!("Failed to load snapshot for subscribers: {err}"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MessageStore for SqliteMessageStore {
    fn append(&self, message: NewMessage) -> BoxFuture<'static, Result<()>> {
        let store = self.clone();
        async move {
            tokio::task::spawn_blocking(move || store.record(message)).await??;
            Ok(())
        }
        .boxed()
    }

    fn subscribe(&self, order: Order, on_change: SnapshotCallback) -> Subscription {
        let state = self.lock();
        let initial = match state.db.all_messages() {
            Ok(messages) => Some(messages),
            Err(err) => {
                log::error!("Failed to load initial snapshot: {err}");
                None
            }
        };
        self.hub.subscribe(order, on_change, initial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn temp_db_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("community-chat-{}.db", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let path = temp_db_path();
        let first_stamp = {
            let store = SqliteMessageStore::open(&path).unwrap();
            store.append(NewMessage::new("kept", "CuriousEagle9")).await.unwrap();
            store.snapshot().unwrap()[0].timestamp
        };

        let reopened = SqliteMessageStore::open(&path).unwrap();
        let messages = reopened.snapshot().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "kept");
        assert_eq!(messages[0].sender, "CuriousEagle9");

        let later = reopened.record(NewMessage::new("later", "CuriousEagle9")).unwrap();
        assert!(later.timestamp > first_stamp);

        drop(reopened);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn ingest_notifies_only_for_new_ids() {
        let store = SqliteMessageStore::in_memory().unwrap();
        let deliveries = Arc::new(AtomicUsize::new(0));
        let counter = deliveries.clone();
        let _subscription = store.subscribe(
            Order::Ascending,
            Arc::new(move |_snapshot: Vec<ChatMessage>| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(deliveries.load(Ordering::SeqCst), 1);

        let remote = NewMessage::new("from a peer", "WittyPanda1")
            .into_message("remote-1".to_string(), Utc::now());
        assert!(store.ingest(&remote).unwrap());
        assert!(!store.ingest(&remote).unwrap());

        assert_eq!(deliveries.load(Ordering::SeqCst), 2);
        assert_eq!(store.snapshot().unwrap().len(), 1);
    }
}
