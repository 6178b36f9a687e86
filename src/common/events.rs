use super::types::ChatMessage;

/// Inputs of the chat view reducer.
#[derive(Debug, Clone)]
pub enum ViewEvent {
    /// Full ordered snapshot pushed by the store subscription.
    SnapshotReceived(Vec<ChatMessage>),
    ComposerChanged(String),
    Submit,
}
