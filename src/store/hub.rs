use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::common::{ChatMessage, Order};

use super::Subscription;

pub type SnapshotCallback = Arc<dyn Fn(Vec<ChatMessage>) + Send + Sync>;

/// `None` once the subscription is cancelled.
type Slot = Arc<Mutex<Option<SnapshotCallback>>>;

struct Subscriber {
    id: u64,
    order: Order,
    slot: Slot,
}

/// Fan-out of snapshots to the live subscribers of one store.
#[derive(Default)]
pub struct SnapshotHub {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl SnapshotHub {
    /// Registers `on_change` and delivers `initial` (ascending) to it.
    pub fn subscribe(
        self: &Arc<Self>,
        order: Order,
        on_change: SnapshotCallback,
        initial: Option<Vec<ChatMessage>>,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot: Slot = Arc::new(Mutex::new(Some(on_change)));
        self.subscribers().push(Subscriber {
            id,
            order,
            slot: slot.clone(),
        });

        if let Some(initial) = initial {
            deliver(&slot, order.arrange(initial));
        }

        let hub = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(hub) = hub.upgrade() {
                hub.subscribers().retain(|subscriber| subscriber.id != id);
            }
            lock(&slot).take();
        })
    }

    /// Pushes the ascending collection to every live subscriber.
    pub fn publish(&self, ascending: &[ChatMessage]) {
        let targets: Vec<(Order, Slot)> = self
            .subscribers()
            .iter()
            .map(|subscriber| (subscriber.order, subscriber.slot.clone()))
            .collect();

        for (order, slot) in targets {
            deliver(&slot, order.arrange(ascending.to_vec()));
        }
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }

    fn subscribers(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        lock(&self.subscribers)
    }
}

fn deliver(slot: &Slot, snapshot: Vec<ChatMessage>) {
    let guard = lock(slot);
    if let Some(on_change) = guard.as_ref() {
        on_change(snapshot);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
