//! Error types shared by the stores, identity storage and network task.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    /// SQLite error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking database job did not finish
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Gossip network error
    #[error("network error: {0}")]
    Network(String),

    /// The store refused the write
    #[error("write rejected: {0}")]
    Rejected(String),

    /// The store or its network task has shut down
    #[error("message store is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, ChatError>;
