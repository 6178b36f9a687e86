use std::sync::{Arc, Mutex, MutexGuard};

use futures::FutureExt;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::common::types::sort_chronologically;
use crate::common::{ChatMessage, NewMessage, Order};
use crate::error::Result;

use super::clock::WriteClock;
use super::hub::{SnapshotCallback, SnapshotHub};
use super::{MessageStore, Subscription};

#[derive(Default)]
struct State {
    messages: Vec<ChatMessage>,
    clock: WriteClock,
}

/// In-process store; the collection lives as long as the process.
#[derive(Clone, Default)]
pub struct MemoryMessageStore {
    state: Arc<Mutex<State>>,
    hub: Arc<SnapshotHub>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, message: NewMessage) -> ChatMessage {
        let mut state = self.lock();
        let timestamp = state.clock.stamp();
        let message = message.into_message(Uuid::new_v4().to_string(), timestamp);
        state.messages.push(message.clone());
        sort_chronologically(&mut state.messages);
        self.hub.publish(&state.messages);
        message
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.lock().messages.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MessageStore for MemoryMessageStore {
    fn append(&self, message: NewMessage) -> BoxFuture<'static, Result<()>> {
        let store = self.clone();
        async move {
            store.record(message);
            Ok(())
        }
        .boxed()
    }

    fn subscribe(&self, order: Order, on_change: SnapshotCallback) -> Subscription {
        let state = self.lock();
        self.hub
            .subscribe(order, on_change, Some(state.messages.clone()))
    }
}
