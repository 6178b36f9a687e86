use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::ChatMessage;

/// JSON frames exchanged on the gossip topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WireFrame {
    /// A message appended by the sender.
    Message(ChatMessage),
    /// Summary of the sender's history; peers answer with what differs.
    SyncRequest { buckets: Vec<BucketDigest> },
    /// Part of an answer to a sync request, oldest first.
    History { messages: Vec<ChatMessage> },
}

/// Fingerprint of the message ids stored for one UTC day.
/// `day` is `None` for messages that never got a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketDigest {
    pub day: Option<i64>,
    pub count: usize,
    pub digest: Uuid,
}

impl WireFrame {
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn decode(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
