use crate::common::{ChatMessage, NewMessage, ViewEvent};

/// Local state of the chat view: the last delivered snapshot and the
/// composer text.
#[derive(Debug, Default)]
pub struct ChatViewState {
    pub messages: Vec<ChatMessage>,
    pub composer: String,
}

impl ChatViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one event into the state. A `Submit` that produces a message
    /// returns it for the caller to append.
    pub fn apply(&mut self, event: ViewEvent, sender: &str) -> Option<NewMessage> {
        match event {
            ViewEvent::SnapshotReceived(snapshot) => {
                self.messages = snapshot;
                None
            }
            ViewEvent::ComposerChanged(text) => {
                self.composer = text;
                None
            }
            ViewEvent::Submit => self.take_submission(sender),
        }
    }

    fn take_submission(&mut self, sender: &str) -> Option<NewMessage> {
        if self.composer.trim().is_empty() {
            return None;
        }
        let text = std::mem::take(&mut self.composer);
        Some(NewMessage::new(text, sender))
    }
}
