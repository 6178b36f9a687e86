//! History reconciliation between replicas.
//!
//! A sync request carries one [`BucketDigest`] per UTC day of stored
//! messages. The receiver compares them with its own and sends back every
//! message from the days that differ, split into frames that fit the gossip
//! size limit. Both sides request on subscribe, so after one exchange each
//! replica holds the union of both histories.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::common::ChatMessage;

use super::wire::{BucketDigest, WireFrame};

const DAY_MICROS: i64 = 86_400_000_000;

/// Room left in every frame for the signed gossipsub envelope.
pub const FRAME_RESERVE: usize = 1024;

const EMPTY_HISTORY_BYTES: usize = r#"{"kind":"history","messages":[]}"#.len();

fn day_of(timestamp: Option<DateTime<Utc>>) -> Option<i64> {
    timestamp.map(|ts| ts.timestamp_micros().div_euclid(DAY_MICROS))
}

fn digest_of(sorted_ids: &[&str]) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, sorted_ids.join("\n").as_bytes())
}

/// One digest per day holding at least one message, pending ones last.
pub fn summarize(messages: &[ChatMessage]) -> Vec<BucketDigest> {
    let mut days: BTreeMap<(bool, Option<i64>), Vec<&str>> = BTreeMap::new();
    for message in messages {
        let day = day_of(message.timestamp);
        days.entry((day.is_none(), day))
            .or_default()
            .push(&message.id);
    }

    days.into_iter()
        .map(|((_, day), mut ids)| {
            ids.sort_unstable();
            BucketDigest {
                day,
                count: ids.len(),
                digest: digest_of(&ids),
            }
        })
        .collect()
}

/// Local messages from every day whose digest differs from the peer's.
pub fn missing_from(local: Vec<ChatMessage>, remote: &[BucketDigest]) -> Vec<ChatMessage> {
    let theirs: HashMap<Option<i64>, &BucketDigest> =
        remote.iter().map(|bucket| (bucket.day, bucket)).collect();
    let stale: HashSet<Option<i64>> = summarize(&local)
        .into_iter()
        .filter(|ours| theirs.get(&ours.day).copied() != Some(ours))
        .map(|ours| ours.day)
        .collect();

    local
        .into_iter()
        .filter(|message| stale.contains(&day_of(message.timestamp)))
        .collect()
}

/// Whether a message frame stays under the transmit limit once signed.
pub fn fits_in_frame(message: &ChatMessage, max_frame_bytes: usize) -> bool {
    match WireFrame::Message(message.clone()).encode() {
        Ok(bytes) => bytes.len() + FRAME_RESERVE <= max_frame_bytes,
        Err(_) => false,
    }
}

/// Splits `messages` into history frames of at most `batch` messages whose
/// encoding stays under `max_frame_bytes`. Keeps order. A message too large
/// for any frame is dropped with a warning.
pub fn pack_history(
    messages: Vec<ChatMessage>,
    batch: usize,
    max_frame_bytes: usize,
) -> Vec<WireFrame> {
    let budget = max_frame_bytes.saturating_sub(FRAME_RESERVE);
    let mut frames = Vec::new();
    let mut current = Vec::new();
    let mut size = EMPTY_HISTORY_BYTES;

    for message in messages {
        // One extra byte for the separating comma.
        let encoded = match serde_json::to_vec(&message) {
            Ok(bytes) => bytes.len() + 1,
            Err(err) => {
                log::warn!("Skipping message {} in history: {err}", message.id);
                continue;
            }
        };
        if EMPTY_HISTORY_BYTES + encoded > budget {
            log::warn!(
                "Message {} is too large to sync ({encoded} bytes)",
                message.id
            );
            continue;
        }

        if !current.is_empty() && (current.len() >= batch || size + encoded > budget) {
            frames.push(WireFrame::History {
                messages: std::mem::take(&mut current),
            });
            size = EMPTY_HISTORY_BYTES;
        }
        size += encoded;
        current.push(message);
    }

    if !current.is_empty() {
        frames.push(WireFrame::History { messages: current });
    }
    frames
}
