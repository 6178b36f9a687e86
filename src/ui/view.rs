//! Chat view lifecycle: subscribe on mount, append on submit, release the
//! subscription on unmount.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::common::{ChatMessage, NewMessage, Order, ViewEvent};
use crate::identity::{IdentityProvider, LocalStorage};
use crate::store::{MessageStore, SnapshotCallback, Subscription};

use super::state::ChatViewState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    Mounting,
    Subscribed,
    Unmounted,
}

pub struct ChatView {
    phase: ViewPhase,
    display_name: String,
    state: ChatViewState,
    snapshots: Option<mpsc::UnboundedReceiver<Vec<ChatMessage>>>,
    subscription: Option<Subscription>,
    outbox: Option<mpsc::UnboundedSender<NewMessage>>,
}

impl ChatView {
    /// Resolves the display name and subscribes to `store`. `notify` runs
    /// whenever a snapshot is waiting to be picked up by [`ChatView::pump`].
    ///
    /// Must be called inside a tokio runtime; appends run on a spawned task.
    pub fn mount<S: LocalStorage>(
        store: Arc<dyn MessageStore>,
        identity: &IdentityProvider<S>,
        notify: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        let mut view = Self {
            phase: ViewPhase::Mounting,
            display_name: identity.get_or_create_display_name(),
            state: ChatViewState::new(),
            snapshots: None,
            subscription: None,
            outbox: None,
        };

        let (snapshot_tx, snapshot_rx) = mpsc::unbounded_channel();
        let on_change: SnapshotCallback = Arc::new(move |snapshot: Vec<ChatMessage>| {
            // Fails only once the view is gone.
            if snapshot_tx.send(snapshot).is_ok() {
                notify();
            }
        });

        view.subscription = Some(store.subscribe(Order::Ascending, on_change));
        view.snapshots = Some(snapshot_rx);
        view.outbox = Some(spawn_writer(store));
        view.phase = ViewPhase::Subscribed;
        log::info!("Chat view subscribed as {}", view.display_name);
        view
    }

    /// Applies the newest pending snapshot. Returns whether the list changed.
    pub fn pump(&mut self) -> bool {
        let Some(snapshots) = self.snapshots.as_mut() else {
            return false;
        };

        let mut latest = None;
        while let Ok(snapshot) = snapshots.try_recv() {
            latest = Some(snapshot);
        }

        match latest {
            Some(snapshot) => {
                self.state
                    .apply(ViewEvent::SnapshotReceived(snapshot), &self.display_name);
                true
            }
            None => false,
        }
    }

    pub fn set_composer(&mut self, text: impl Into<String>) {
        self.state
            .apply(ViewEvent::ComposerChanged(text.into()), &self.display_name);
    }

    /// Lets a text widget edit a copy of the composer. A changed draft is
    /// applied as a `ComposerChanged` event.
    pub fn edit_composer<R>(&mut self, edit: impl FnOnce(&mut String) -> R) -> R {
        let mut draft = self.state.composer.clone();
        let result = edit(&mut draft);
        if draft != self.state.composer {
            self.set_composer(draft);
        }
        result
    }

    #[cfg(test)]
    pub fn composer(&self) -> &str {
        &self.state.composer
    }

    /// Queues the composer text for appending and clears it right away.
    ///
    /// Blank text is ignored. The append is not awaited: a failure is only
    /// logged and the cleared text is not restored.
    pub fn submit(&mut self) -> bool {
        if self.phase != ViewPhase::Subscribed {
            return false;
        }
        let Some(message) = self.state.apply(ViewEvent::Submit, &self.display_name) else {
            return false;
        };

        if let Some(outbox) = &self.outbox {
            if let Err(err) = outbox.send(message) {
                log::error!("Error sending message: {err}");
            }
        }
        true
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.state.messages
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[cfg(test)]
    pub fn phase(&self) -> ViewPhase {
        self.phase
    }

    pub fn unmount(&mut self) {
        if self.phase == ViewPhase::Unmounted {
            return;
        }
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.snapshots = None;
        self.outbox = None;
        self.phase = ViewPhase::Unmounted;
        log::info!("Chat view unmounted");
    }
}

impl Drop for ChatView {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Appends queued messages one at a time so they reach the store in the
/// order they were sent.
fn spawn_writer(store: Arc<dyn MessageStore>) -> mpsc::UnboundedSender<NewMessage> {
    let (tx, mut rx) = mpsc::unbounded_channel::<NewMessage>();
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(err) = store.append(message).await {
                log::error!("Error sending message: {err}");
            }
        }
    });
    tx
}
