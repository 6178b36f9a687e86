use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Result as SqlResult, Row, params};
use std::path::Path;

use super::database::Database;
use crate::common::ChatMessage;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        text TEXT NOT NULL,
        sender TEXT NOT NULL,
        timestamp INTEGER,
        avatar_color TEXT NOT NULL DEFAULT ''
    );
    CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages(timestamp);
";

const SELECT_COLUMNS: &str = "SELECT id, text, sender, timestamp, avatar_color FROM messages";
/// Pending timestamps last, ties in insertion order.
const CHRONOLOGICAL: &str = "ORDER BY timestamp IS NULL, timestamp ASC, rowid ASC";

/// Append-only message collection.
pub struct MessageDatabase {
    db: Database,
}

impl MessageDatabase {
    pub fn with_path<P: AsRef<Path>>(path: P) -> SqlResult<Self> {
        Ok(Self {
            db: Database::open(path, SCHEMA)?,
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> SqlResult<Self> {
        Ok(Self {
            db: Database::in_memory(SCHEMA)?,
        })
    }

    /// Insert a message unless its id is already stored. Returns whether a row was added.
    pub fn insert_message(&self, message: &ChatMessage) -> SqlResult<bool> {
        let conn = self.db.connection();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO messages (id, text, sender, timestamp, avatar_color)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.id,
                message.text,
                message.sender,
                message.timestamp.map(|ts| ts.timestamp_micros()),
                message.avatar_color
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Every message, oldest first.
    pub fn all_messages(&self) -> SqlResult<Vec<ChatMessage>> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} {CHRONOLOGICAL}"))?;
        let messages = stmt
            .query_map([], message_from_row)?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(messages)
    }

    pub fn latest_timestamp(&self) -> SqlResult<Option<DateTime<Utc>>> {
        let conn = self.db.connection();
        let micros: Option<i64> = conn
            .query_row("SELECT MAX(timestamp) FROM messages", [], |row| {
                row.get::<_, Option<i64>>(0)
            })
            .optional()?
            .flatten();
        Ok(micros.and_then(DateTime::from_timestamp_micros))
    }

    pub fn message_count(&self) -> SqlResult<usize> {
        let conn = self.db.connection();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn message_from_row(row: &Row<'_>) -> SqlResult<ChatMessage> {
    let micros: Option<i64> = row.get(3)?;
    Ok(ChatMessage {
        id: row.get(0)?,
        text: row.get(1)?,
        sender: row.get(2)?,
        timestamp: micros.and_then(DateTime::from_timestamp_micros),
        avatar_color: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str, micros: Option<i64>) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            text: format!("text of {id}"),
            sender: "WittyWolf3".to_string(),
            timestamp: micros.and_then(DateTime::from_timestamp_micros),
            avatar_color: "hsl(10, 70%, 60%)".to_string(),
        }
    }

    #[test]
    fn lists_messages_chronologically() {
        let db = MessageDatabase::in_memory().unwrap();
        db.insert_message(&message("pending", None)).unwrap();
        db.insert_message(&message("second", Some(2_000))).unwrap();
        db.insert_message(&message("first", Some(1_000))).unwrap();

        let ids: Vec<_> = db
            .all_messages()
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, ["first", "second", "pending"]);
    }

    #[test]
    fn ignores_duplicate_ids() {
        let db = MessageDatabase::in_memory().unwrap();
        assert!(db.insert_message(&message("a", Some(1))).unwrap());
        assert!(!db.insert_message(&message("a", Some(5))).unwrap());
        assert_eq!(db.message_count().unwrap(), 1);
        assert_eq!(
            db.all_messages().unwrap()[0].timestamp,
            DateTime::from_timestamp_micros(1)
        );
    }

    #[test]
    fn latest_timestamp_ignores_pending_messages() {
        let db = MessageDatabase::in_memory().unwrap();
        for (id, micros) in [("a", 10), ("c", 30), ("b", 20)] {
            db.insert_message(&message(id, Some(micros))).unwrap();
        }
        db.insert_message(&message("pending", None)).unwrap();

        assert_eq!(
            db.latest_timestamp().unwrap(),
            DateTime::from_timestamp_micros(30)
        );
    }

    #[test]
    fn empty_collection_has_no_latest_timestamp() {
        let db = MessageDatabase::in_memory().unwrap();
        assert_eq!(db.latest_timestamp().unwrap(), None);
    }
}
