use chrono::{DateTime, Duration, Utc};

use crate::config::Config;
use crate::constants::{ERR_EMPTY_USER_ID, MAX_SLOT_PROBES, TIMESTAMP_KEY_FORMAT};
use crate::db::{keys, kv, tables, Db};
use crate::error::{AppError, Result};
use crate::models::SecurityLogEntry;
use crate::normalize::normalize_user_id;

/// Append-only, TTL-bounded log of per-user security events.
///
/// Entries are keyed by a millisecond-resolution timestamp whose
/// lexicographic order is chronological, so one user's log enumerates in
/// event order without a separate sequence counter.
pub struct SecurityLogStore {
    db: Db,
    log_ttl_secs: i64,
}

impl SecurityLogStore {
    pub fn new(db: Db, config: &Config) -> Self {
        Self {
            db,
            log_ttl_secs: config.security_log_ttl_secs,
        }
    }

    fn event_key(user_id: &str, at: DateTime<Utc>) -> String {
        keys::security_log(user_id, &at.format(TIMESTAMP_KEY_FORMAT).to_string())
    }

    /// Append an event at the current instant.
    ///
    /// If the millisecond slot is already occupied for this user, the
    /// effective timestamp advances by one millisecond until a free slot is
    /// found. The probe value strictly increases, so the loop converges;
    /// exhausting the cap means the keyspace is corrupted, not contended.
    pub fn log_event(
        &self,
        user_id: &str,
        event_name: &str,
        remote_ip: &str,
        user_agent: &str,
    ) -> Result<()> {
        let user_id = normalize_user_id(user_id);
        if user_id.is_empty() {
            return Err(AppError::InvalidInput(ERR_EMPTY_USER_ID.to_string()));
        }
        if event_name.is_empty() {
            return Err(AppError::InvalidInput("event name is empty".to_string()));
        }

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(tables::HOST)?;

            let mut current = Utc::now();
            let mut slot = None;
            for _ in 0..MAX_SLOT_PROBES {
                let key = Self::event_key(&user_id, current);
                if kv::get_raw(&table, &key)?.is_none() {
                    slot = Some((key, current));
                    break;
                }
                current = current + Duration::milliseconds(1);
            }
            let (key, effective) = slot.ok_or_else(|| {
                AppError::Integrity(format!(
                    "no free security-log slot for user '{}'",
                    user_id
                ))
            })?;

            let entry = SecurityLogEntry {
                event_name: event_name.to_string(),
                event_time: effective.timestamp(),
                remote_ip: remote_ip.to_string(),
                user_agent: user_agent.to_string(),
            };
            kv::put_with_ttl(&mut table, &key, &entry, self.log_ttl_secs)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Visit a user's events in chronological (key) order.
    ///
    /// The visitor returns `false` to stop early. Reverse or paginated
    /// traversal is the caller's concern; the store only guarantees
    /// ascending order.
    pub fn enum_events<F>(&self, user_id: &str, mut visit: F) -> Result<()>
    where
        F: FnMut(SecurityLogEntry) -> bool,
    {
        let user_id = normalize_user_id(user_id);
        if user_id.is_empty() {
            return Err(AppError::InvalidInput(ERR_EMPTY_USER_ID.to_string()));
        }

        let txn = self.db.begin_read()?;
        let table = txn.open_table(tables::HOST)?;
        kv::scan_prefix(&table, &keys::security_log_prefix(&user_id), |_, payload| {
            let entry: SecurityLogEntry = kv::decode(payload)?;
            Ok(visit(entry))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_event_key_orders_chronologically() {
        let base = Utc.timestamp_millis_opt(1_733_788_800_123).unwrap();
        let k1 = SecurityLogStore::event_key("u00001", base);
        let k2 = SecurityLogStore::event_key("u00001", base + Duration::milliseconds(1));
        let k3 = SecurityLogStore::event_key("u00001", base + Duration::seconds(1));
        assert!(k1 < k2);
        assert!(k2 < k3);
    }

    #[test]
    fn test_event_key_millisecond_resolution() {
        let base = Utc.timestamp_millis_opt(1_733_788_800_000).unwrap();
        let key = SecurityLogStore::event_key("u00001", base);
        assert!(key.starts_with("u00001:user:security-log:"));
        assert!(key.ends_with(".000"));
    }
}
