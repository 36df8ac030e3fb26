use thiserror::Error;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::error::EncodeError),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] bincode::error::DecodeError),

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("User not found")]
    UserNotFound,

    #[error("Page '{0}' already exists")]
    PageAlreadyExists(String),

    #[error("Page not found")]
    PageNotFound,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Invalid recover code")]
    InvalidRecoverCode,

    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Concurrent transaction conflict")]
    ConcurrentConflict,
}

impl AppError {
    /// Whether the operation may be retried as-is.
    ///
    /// Only a transaction rejected by the store's conflict detector is
    /// retryable; integrity errors and passthrough storage errors are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::ConcurrentConflict)
    }
}

/// Run `f`, retrying up to `attempts` times while it fails with a
/// transaction conflict. The last error is surfaced once the budget is spent.
pub fn with_conflict_retry<T, F>(attempts: u32, mut f: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut last = AppError::ConcurrentConflict;
    for attempt in 0..attempts.max(1) {
        match f() {
            Err(e) if e.is_retryable() => {
                tracing::warn!("Concurrent transaction conflict, attempt {}", attempt + 1);
                last = e;
            }
            other => return other,
        }
    }
    Err(last)
}

/// Result type alias for application results
pub type Result<T> = std::result::Result<T, AppError>;
