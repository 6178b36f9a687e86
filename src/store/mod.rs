//! Live-query message stores.
//!
//! Every backend offers the same two capabilities: `append` a message and
//! `subscribe` to the full ordered collection. A subscriber receives the
//! current snapshot right away and a fresh one after every insertion.

pub mod clock;
pub mod hub;
pub mod memory;
pub mod replicated;
pub mod sqlite;

use futures::future::BoxFuture;

use crate::common::{NewMessage, Order};
use crate::error::Result;

pub use hub::SnapshotCallback;
pub use memory::MemoryMessageStore;
pub use replicated::ReplicatedMessageStore;
pub use sqlite::SqliteMessageStore;

pub trait MessageStore: Send + Sync {
    /// Stores a message, assigning its id and timestamp. Appends issued one
    /// after another by the same caller keep their order.
    fn append(&self, message: NewMessage) -> BoxFuture<'static, Result<()>>;

    /// Registers `on_change` for snapshots ordered by timestamp.
    ///
    /// Callbacks run on the writer's thread while the store is locked, so
    /// they must hand the snapshot off instead of calling back into the store.
    fn subscribe(&self, order: Order, on_change: SnapshotCallback) -> Subscription;
}

/// Handle of a live subscription. Cancelling it (explicitly or by dropping
/// it) guarantees the callback is never invoked again.
#[must_use = "dropping a Subscription cancels it"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn cancels_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let subscription = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        subscription.unsubscribe();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_cancels() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        drop(Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
