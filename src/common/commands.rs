use super::types::ChatMessage;

/// Commands the replicated store sends down to the network task.
#[derive(Debug, Clone)]
pub enum NetworkCommand {
    /// Broadcast a message that was just recorded locally.
    Publish(ChatMessage),
}
