use rusqlite::{OptionalExtension, Result as SqlResult, params};
use std::path::Path;

use super::database::Database;
use crate::error::Result;
use crate::identity::LocalStorage;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS local_storage (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

/// Device-local key-value pairs (the display name lives here).
pub struct LocalStorageDatabase {
    db: Database,
}

impl LocalStorageDatabase {
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
}

impl LocalStorage for LocalStorageDatabase {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .db
            .connection()
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn store(&self, key: &str, value: &str) -> Result<()> {
        self.db.connection().execute(
            "INSERT OR REPLACE INTO local_storage (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}
