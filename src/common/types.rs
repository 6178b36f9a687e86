use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::avatar::{self, AvatarColor};

/// A stored chat message. Created by the store on append, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub sender: String,
    /// Assigned by the store. `None` until a timestamp is known.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// `hsl(..)` string computed from `sender` at write time.
    #[serde(default)]
    pub avatar_color: String,
}

impl ChatMessage {
    /// Color persisted with the message, or the live one when it is missing.
    pub fn avatar(&self) -> AvatarColor {
        self.avatar_color
            .parse()
            .unwrap_or_else(|_| avatar::color_for(&self.sender))
    }
}

/// Payload of an append. The store assigns `id` and `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub text: String,
    pub sender: String,
    pub avatar_color: AvatarColor,
}

impl NewMessage {
    pub fn new(text: impl Into<String>, sender: impl Into<String>) -> Self {
        let sender = sender.into();
        Self {
            text: text.into(),
            avatar_color: avatar::color_for(&sender),
            sender,
        }
    }

    pub fn into_message(self, id: String, timestamp: DateTime<Utc>) -> ChatMessage {
        ChatMessage {
            id,
            text: self.text,
            sender: self.sender,
            timestamp: Some(timestamp),
            avatar_color: self.avatar_color.to_string(),
        }
    }
}

/// Direction of the timestamp ordering of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Ascending,
    Descending,
}

impl Order {
    /// Reorders an ascending snapshot.
    pub fn arrange(self, mut ascending: Vec<ChatMessage>) -> Vec<ChatMessage> {
        if self == Order::Descending {
            ascending.reverse();
        }
        ascending
    }
}

/// Stable sort by timestamp; messages without one go last.
pub fn sort_chronologically(messages: &mut [ChatMessage]) {
    messages.sort_by_key(|message| (message.timestamp.is_none(), message.timestamp));
}
