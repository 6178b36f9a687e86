pub mod database;
pub mod local_db;
pub mod message_db;

pub use local_db::LocalStorageDatabase;
pub use message_db::MessageDatabase;

use std::fs;
use std::path::Path;

/// Create the directory a database file will live in.
pub fn ensure_parent_dir(path: &str) -> std::io::Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
