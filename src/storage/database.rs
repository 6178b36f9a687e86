use rusqlite::{Connection, Result as SqlResult};
use std::path::Path;

/// SQLite connection whose schema is created on open.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (or creates) the file and runs `schema`, which must be idempotent.
    pub fn open<P: AsRef<Path>>(path: P, schema: &str) -> SqlResult<Self> {
        Self::with_schema(Connection::open(path)?, schema)
    }

    #[cfg(test)]
    pub fn in_memory(schema: &str) -> SqlResult<Self> {
        Self::with_schema(Connection::open_in_memory()?, schema)
    }

    fn with_schema(conn: Connection, schema: &str) -> SqlResult<Self> {
        conn.execute_batch(schema)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
