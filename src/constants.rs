/// Initial value for the user-id sequence counter.
/// Chosen so that the base62 encoding of the very first id is "u00001".
pub const DEFAULT_INITIAL_USER_ID: u64 = 27_483_984_961;

/// Default retention for security log entries (one year)
pub const DEFAULT_SECURITY_LOG_TTL_SECS: i64 = 31_536_000;

/// Default lifetime of a password recover code (15 minutes)
pub const DEFAULT_RECOVER_CODE_TTL_SECS: i64 = 900;

/// Batch size for prefix sweeps (one write transaction per batch)
pub const BATCH_SIZE: usize = 1000;

/// Timestamp key format for security log entries.
/// Millisecond resolution; lexicographic order equals chronological order.
pub const TIMESTAMP_KEY_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Maximum free-slot probes when allocating a user id or an event timestamp.
/// The probe value strictly increases, so hitting this cap means the keyspace
/// is corrupted rather than contended.
pub const MAX_SLOT_PROBES: u32 = 1000;

/// Default attempt budget when retrying a conflicted transaction
pub const DEFAULT_TXN_RETRY_ATTEMPTS: u32 = 5;

// =============================================================================
// Error Messages
// =============================================================================

/// Error message for an empty email after normalization
pub const ERR_EMPTY_EMAIL: &str = "user email is empty";

/// Error message for an empty password
pub const ERR_EMPTY_PASSWORD: &str = "user password is empty";

/// Error message for an empty user id after normalization
pub const ERR_EMPTY_USER_ID: &str = "user id is empty";

/// Error message for an empty page name after normalization
pub const ERR_EMPTY_PAGE_NAME: &str = "page name is empty";
