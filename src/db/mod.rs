pub mod keys;
pub mod kv;
pub mod tables;

use redb::Database;
use std::path::Path;
use std::sync::Arc;

use crate::error::{AppError, Result};

/// Database handle type (Arc-wrapped for sharing across stores)
pub type Db = Arc<Database>;

/// Open or create the host database at the given path
///
/// Creates the host table on first run.
pub fn open_database(path: impl AsRef<Path>) -> Result<Db> {
    tracing::info!("Opening database at: {:?}", path.as_ref());

    // Create parent directory if it doesn't exist
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| {
                tracing::error!("Failed to create database directory: {}", e);
                AppError::Io(e)
            })?;
        }
    }

    let db = Database::create(path)?;

    // Initialize the table on first run by opening it
    let write_txn = db.begin_write()?;
    {
        let _ = write_txn.open_table(tables::HOST)?;
    }
    write_txn.commit()?;

    tracing::info!("Database initialized successfully");

    Ok(Arc::new(db))
}
