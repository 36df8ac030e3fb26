//! Envelope-level access to the host keyspace.
//!
//! Every stored value is wrapped in an [`Envelope`] carrying an optional
//! expiry, since the engine has no native TTL. Expiry is lazy: reads and
//! scans treat an expired envelope as absent; the bytes are reclaimed when
//! the key is overwritten or swept.
//!
//! All functions here operate on an already-open table, so a caller that
//! opens one write transaction and performs several operations gets them
//! applied atomically on commit.

use chrono::Utc;
use redb::ReadableTable;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::constants::BATCH_SIZE;
use crate::db::tables;
use crate::error::Result;

pub const BINCODE_CONFIG: bincode::config::Configuration = bincode::config::standard();

/// Write-capable host table bound to an open transaction
pub type HostTable<'txn> = redb::Table<'txn, &'static str, &'static [u8]>;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    /// Unix timestamp past which the value is treated as absent
    expires_at: Option<i64>,
    payload: Vec<u8>,
}

fn is_expired(env: &Envelope) -> bool {
    matches!(env.expires_at, Some(at) if at <= Utc::now().timestamp())
}

/// Point read returning the raw payload, TTL-filtered.
pub fn get_raw<T>(table: &T, key: &str) -> Result<Option<Vec<u8>>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(key)? {
        Some(guard) => {
            let (env, _): (Envelope, _) =
                bincode::serde::decode_from_slice(guard.value(), BINCODE_CONFIG)?;
            if is_expired(&env) {
                return Ok(None);
            }
            Ok(Some(env.payload))
        }
        None => Ok(None),
    }
}

/// Decode a payload produced by [`put`]; used with the raw scan/read paths.
pub fn decode<V: DeserializeOwned>(payload: &[u8]) -> Result<V> {
    let (value, _) = bincode::serde::decode_from_slice(payload, BINCODE_CONFIG)?;
    Ok(value)
}

/// Point read, TTL-filtered and deserialized.
pub fn get<V, T>(table: &T, key: &str) -> Result<Option<V>>
where
    V: DeserializeOwned,
    T: ReadableTable<&'static str, &'static [u8]>,
{
    match get_raw(table, key)? {
        Some(payload) => Ok(Some(decode(&payload)?)),
        None => Ok(None),
    }
}

/// Write a value with no expiry.
pub fn put<V: Serialize>(table: &mut HostTable<'_>, key: &str, value: &V) -> Result<()> {
    put_envelope(table, key, value, None)
}

/// Write a value that expires `ttl_secs` from now.
pub fn put_with_ttl<V: Serialize>(
    table: &mut HostTable<'_>,
    key: &str,
    value: &V,
    ttl_secs: i64,
) -> Result<()> {
    let expires_at = Utc::now().timestamp() + ttl_secs;
    put_envelope(table, key, value, Some(expires_at))
}

fn put_envelope<V: Serialize>(
    table: &mut HostTable<'_>,
    key: &str,
    value: &V,
    expires_at: Option<i64>,
) -> Result<()> {
    let payload = bincode::serde::encode_to_vec(value, BINCODE_CONFIG)?;
    let env = Envelope { expires_at, payload };
    let bytes = bincode::serde::encode_to_vec(&env, BINCODE_CONFIG)?;
    table.insert(key, bytes.as_slice())?;
    Ok(())
}

/// Remove a key; absent keys are a no-op.
pub fn delete(table: &mut HostTable<'_>, key: &str) -> Result<()> {
    table.remove(key)?;
    Ok(())
}

/// Ascending scan over all live keys starting with `prefix`.
///
/// The visitor returns `Ok(true)` to continue and `Ok(false)` to stop early;
/// expired entries are skipped without being surfaced.
pub fn scan_prefix<T, F>(table: &T, prefix: &str, mut visit: F) -> Result<()>
where
    T: ReadableTable<&'static str, &'static [u8]>,
    F: FnMut(&str, &[u8]) -> Result<bool>,
{
    for item in table.range(prefix..)? {
        let (key_guard, value_guard) = item?;
        let key = key_guard.value();
        if !key.starts_with(prefix) {
            break;
        }
        let (env, _): (Envelope, _) =
            bincode::serde::decode_from_slice(value_guard.value(), BINCODE_CONFIG)?;
        if is_expired(&env) {
            continue;
        }
        if !visit(key, &env.payload)? {
            break;
        }
    }
    Ok(())
}

/// Increment the integer counter at `key` by `delta` and return the new
/// value. An absent counter seeds at `initial`, so the first call returns the
/// seed itself. Atomic within the enclosing write transaction.
pub fn increment(table: &mut HostTable<'_>, key: &str, initial: u64, delta: u64) -> Result<u64> {
    let next = match get::<u64, _>(&*table, key)? {
        Some(current) => current + delta,
        None => initial,
    };
    put(table, key, &next)?;
    Ok(next)
}

/// Physically remove every key under `prefix`, expired entries included.
///
/// Runs one write transaction per batch; this is a best-effort bulk sweep,
/// not an atomic operation, and partial completion leaves the keyspace valid.
pub fn sweep_prefix(db: &redb::Database, prefix: &str) -> Result<u64> {
    let mut removed = 0u64;
    loop {
        let txn = db.begin_write()?;
        let removed_now = {
            let mut table = txn.open_table(tables::HOST)?;
            let batch: Vec<String> = {
                let mut keys = Vec::new();
                for item in table.range(prefix..)? {
                    let (key_guard, _) = item?;
                    let key = key_guard.value();
                    if !key.starts_with(prefix) {
                        break;
                    }
                    keys.push(key.to_string());
                    if keys.len() >= BATCH_SIZE {
                        break;
                    }
                }
                keys
            };
            for key in &batch {
                table.remove(key.as_str())?;
            }
            batch.len()
        };
        if removed_now == 0 {
            return Ok(removed);
        }
        txn.commit()?;
        removed += removed_now as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redb::Database;
    use tempfile::TempDir;

    fn test_db(temp_dir: &TempDir) -> Database {
        let db = Database::create(temp_dir.path().join("test.db")).unwrap();
        let txn = db.begin_write().unwrap();
        {
            let _ = txn.open_table(tables::HOST).unwrap();
        }
        txn.commit().unwrap();
        db
    }

    #[test]
    fn test_put_get_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let db = test_db(&temp_dir);

        let txn = db.begin_write().unwrap();
        {
            let mut table = txn.open_table(tables::HOST).unwrap();
            put(&mut table, "k1", &"hello".to_string()).unwrap();
        }
        txn.commit().unwrap();

        let txn = db.begin_read().unwrap();
        let table = txn.open_table(tables::HOST).unwrap();
        let value: Option<String> = get(&table, "k1").unwrap();
        assert_eq!(value.as_deref(), Some("hello"));
        let missing: Option<String> = get(&table, "k2").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_ttl_expiry() {
        let temp_dir = TempDir::new().unwrap();
        let db = test_db(&temp_dir);

        let txn = db.begin_write().unwrap();
        {
            let mut table = txn.open_table(tables::HOST).unwrap();
            put_with_ttl(&mut table, "live", &1u64, 3600).unwrap();
            put_with_ttl(&mut table, "dead", &2u64, 0).unwrap();
        }
        txn.commit().unwrap();

        let txn = db.begin_read().unwrap();
        let table = txn.open_table(tables::HOST).unwrap();
        assert_eq!(get::<u64, _>(&table, "live").unwrap(), Some(1));
        assert_eq!(get::<u64, _>(&table, "dead").unwrap(), None);

        // expired entries are also invisible to scans
        let mut seen = Vec::new();
        scan_prefix(&table, "", |key, _| {
            seen.push(key.to_string());
            Ok(true)
        })
        .unwrap();
        assert_eq!(seen, vec!["live".to_string()]);
    }

    #[test]
    fn test_increment_seeds_then_advances() {
        let temp_dir = TempDir::new().unwrap();
        let db = test_db(&temp_dir);

        let txn = db.begin_write().unwrap();
        {
            let mut table = txn.open_table(tables::HOST).unwrap();
            assert_eq!(increment(&mut table, "ctr", 100, 1).unwrap(), 100);
            assert_eq!(increment(&mut table, "ctr", 100, 1).unwrap(), 101);
            assert_eq!(increment(&mut table, "ctr", 100, 5).unwrap(), 106);
        }
        txn.commit().unwrap();
    }

    #[test]
    fn test_scan_prefix_order_and_early_stop() {
        let temp_dir = TempDir::new().unwrap();
        let db = test_db(&temp_dir);

        let txn = db.begin_write().unwrap();
        {
            let mut table = txn.open_table(tables::HOST).unwrap();
            put(&mut table, "a:2", &2u64).unwrap();
            put(&mut table, "a:1", &1u64).unwrap();
            put(&mut table, "b:1", &3u64).unwrap();
        }
        txn.commit().unwrap();

        let txn = db.begin_read().unwrap();
        let table = txn.open_table(tables::HOST).unwrap();

        let mut seen = Vec::new();
        scan_prefix(&table, "a:", |key, _| {
            seen.push(key.to_string());
            Ok(true)
        })
        .unwrap();
        assert_eq!(seen, vec!["a:1".to_string(), "a:2".to_string()]);

        let mut count = 0;
        scan_prefix(&table, "a:", |_, _| {
            count += 1;
            Ok(false)
        })
        .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_sweep_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let db = test_db(&temp_dir);

        let txn = db.begin_write().unwrap();
        {
            let mut table = txn.open_table(tables::HOST).unwrap();
            put(&mut table, "u1:a", &1u64).unwrap();
            put(&mut table, "u1:b", &2u64).unwrap();
            put(&mut table, "u2:a", &3u64).unwrap();
        }
        txn.commit().unwrap();

        assert_eq!(sweep_prefix(&db, "u1:").unwrap(), 2);

        let txn = db.begin_read().unwrap();
        let table = txn.open_table(tables::HOST).unwrap();
        assert!(get::<u64, _>(&table, "u1:a").unwrap().is_none());
        assert_eq!(get::<u64, _>(&table, "u2:a").unwrap(), Some(3));
    }
}
