use serde::{Deserialize, Serialize};

/// Immutable per-user security event.
///
/// The entry's position in the log is its timestamp key
/// (`{userId}:user:security-log:{timestampKey}`), not a field here;
/// `event_time` records the effective (possibly collision-advanced) instant
/// in whole seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityLogEntry {
    pub event_name: String,
    /// Effective event time (Unix timestamp)
    pub event_time: i64,
    pub remote_ip: String,
    pub user_agent: String,
}
