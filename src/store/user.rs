use chrono::Utc;
use redb::{Database, ReadableTable};

use crate::config::Config;
use crate::constants::{ERR_EMPTY_EMAIL, ERR_EMPTY_PASSWORD, ERR_EMPTY_USER_ID, MAX_SLOT_PROBES};
use crate::db::kv::HostTable;
use crate::db::{keys, kv, tables, Db};
use crate::error::{AppError, Result};
use crate::models::{RecoverCode, RegisterRequest, UserRecord, UserRole};
use crate::normalize::{
    normalize_code, normalize_email, normalize_lower_unreserved, normalize_user_id,
};
use crate::security;

const BASE62_ALPHABET: &[u8; 62] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Encode a sequence number as a compact base62 identifier.
///
/// The configured sequence seed 27483984961 encodes to "u00001".
fn encode_id(mut num: u64) -> String {
    if num == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while num > 0 {
        out.push(BASE62_ALPHABET[(num % 62) as usize]);
        num /= 62;
    }
    out.reverse();
    String::from_utf8(out).expect("alphabet is ASCII")
}

/// Store of user identity records, their email index and back-references,
/// recover codes, and the user-id sequence.
///
/// Every multi-key mutation runs inside one write transaction; an error on
/// any path drops the transaction before commit, so the record, the email
/// index and the back-reference can never diverge.
pub struct UserStore {
    db: Db,
    salt_key: String,
    initial_user_id: u64,
    recover_code_ttl_secs: i64,
}

impl UserStore {
    /// Open the store, bootstrapping the per-deployment salt key on first use.
    pub fn open(db: Db, config: &Config) -> Result<Self> {
        let salt_key = match &config.user_salt_key {
            Some(key) => key.clone(),
            None => Self::load_or_create_salt_key(&db)?,
        };
        Ok(Self {
            db,
            salt_key,
            initial_user_id: config.initial_user_id,
            recover_code_ttl_secs: config.recover_code_ttl_secs,
        })
    }

    fn load_or_create_salt_key(db: &Database) -> Result<String> {
        let txn = db.begin_write()?;
        let key = {
            let mut table = txn.open_table(tables::HOST)?;
            match kv::get::<String, _>(&table, keys::USER_SALT_KEY)? {
                Some(key) => key,
                None => {
                    let key = security::generate_salt_key();
                    kv::put(&mut table, keys::USER_SALT_KEY, &key)?;
                    tracing::info!("Generated new user salt key");
                    key
                }
            }
        };
        txn.commit()?;
        Ok(key)
    }

    /// Allocate the next free user id.
    ///
    /// Increments the persistent sequence and probes the back-reference for
    /// the encoded id; a taken slot (pre-existing or recycled data) advances
    /// the sequence again. The sequence strictly increases, so the loop
    /// terminates on the first gap.
    pub fn generate_user_id(&self) -> Result<String> {
        let txn = self.db.begin_write()?;
        let id = {
            let mut table = txn.open_table(tables::HOST)?;
            self.allocate_user_id(&mut table)?
        };
        txn.commit()?;
        Ok(id)
    }

    fn allocate_user_id(&self, table: &mut HostTable<'_>) -> Result<String> {
        for _ in 0..MAX_SLOT_PROBES {
            let num = kv::increment(table, keys::USER_NEXT_ID, self.initial_user_id, 1)?;
            let id = encode_id(num);
            if kv::get::<String, _>(&*table, &keys::user_back_ref(&id))?.is_none() {
                return Ok(id);
            }
            tracing::warn!("User id {} already taken, advancing sequence", id);
        }
        Err(AppError::Integrity(
            "user id sequence produced no free id".to_string(),
        ))
    }

    /// Register a new user.
    ///
    /// The first user ever created is granted the admin role. Fails with
    /// `UserAlreadyExists` if the normalized email is already indexed.
    pub fn create_user(&self, req: &RegisterRequest) -> Result<UserRecord> {
        let email = normalize_email(&req.email);
        if email.is_empty() {
            return Err(AppError::InvalidInput(ERR_EMPTY_EMAIL.to_string()));
        }
        if req.password.is_empty() {
            return Err(AppError::InvalidInput(ERR_EMPTY_PASSWORD.to_string()));
        }
        let username = normalize_lower_unreserved(&req.username);

        let txn = self.db.begin_write()?;
        let user = {
            let mut table = txn.open_table(tables::HOST)?;

            if kv::get::<String, _>(&table, &keys::email_index(&email))?.is_some() {
                return Err(AppError::UserAlreadyExists);
            }

            // Inside the same transaction as the insert, so two racing first
            // registrations cannot both claim the admin role.
            let role = if Self::has_users(&table)? {
                UserRole::User
            } else {
                UserRole::Admin
            };

            let user_id = self.allocate_user_id(&mut table)?;

            let user = UserRecord {
                user_id: user_id.clone(),
                username,
                first_name: req.first_name.clone(),
                middle_name: req.middle_name.clone(),
                last_name: req.last_name.clone(),
                email: email.clone(),
                password_hash: security::hash_password(&self.salt_key, &req.password),
                role,
                created_at: Utc::now().timestamp(),
            };

            kv::put(&mut table, &keys::user_record(&user_id), &user)?;
            // back reference
            kv::put(&mut table, &keys::user_back_ref(&user_id), &user_id)?;
            // email index
            kv::put(&mut table, &keys::email_index(&email), &user_id)?;

            user
        };
        txn.commit()?;

        tracing::info!("Created user {} with role {:?}", user.user_id, user.role);
        Ok(user)
    }

    fn has_users<T>(table: &T) -> Result<bool>
    where
        T: ReadableTable<&'static str, &'static [u8]>,
    {
        let mut has = false;
        kv::scan_prefix(table, keys::USER_BACK_REF_PREFIX, |_, _| {
            has = true;
            Ok(false)
        })?;
        Ok(has)
    }

    fn load_user<T>(table: &T, user_id: &str) -> Result<UserRecord>
    where
        T: ReadableTable<&'static str, &'static [u8]>,
    {
        let user: UserRecord =
            kv::get(table, &keys::user_record(user_id))?.ok_or(AppError::UserNotFound)?;
        if user.user_id != user_id {
            tracing::error!(
                "User record at '{}' embeds id '{}'",
                user_id,
                user.user_id
            );
            return Err(AppError::Integrity(format!(
                "user record for '{}' embeds id '{}'",
                user_id, user.user_id
            )));
        }
        Ok(user)
    }

    /// Load a user by id.
    ///
    /// Fails with `Integrity` if the stored record disagrees with its own
    /// key — mismatched data is never silently returned.
    pub fn get_user(&self, user_id: &str) -> Result<UserRecord> {
        let user_id = normalize_user_id(user_id);
        if user_id.is_empty() {
            return Err(AppError::InvalidInput(ERR_EMPTY_USER_ID.to_string()));
        }
        let txn = self.db.begin_read()?;
        let table = txn.open_table(tables::HOST)?;
        Self::load_user(&table, &user_id)
    }

    /// Resolve a normalized email to its user id via the secondary index.
    pub fn get_user_id_by_email(&self, email: &str) -> Result<String> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AppError::InvalidInput(ERR_EMPTY_EMAIL.to_string()));
        }
        let txn = self.db.begin_read()?;
        let table = txn.open_table(tables::HOST)?;
        kv::get::<String, _>(&table, &keys::email_index(&email))?.ok_or(AppError::UserNotFound)
    }

    /// Authenticate a login (email or raw user id) against a password.
    ///
    /// A record that fails the hash comparison is logged but never returned;
    /// the caller only sees `InvalidPassword`.
    pub fn authenticate(&self, login: &str, password: &str) -> Result<UserRecord> {
        let login = login.trim();
        if login.is_empty() {
            return Err(AppError::InvalidInput("login is empty".to_string()));
        }

        let txn = self.db.begin_read()?;
        let table = txn.open_table(tables::HOST)?;

        // Resolve as email first, fall back to treating the login as an id
        let user_id =
            match kv::get::<String, _>(&table, &keys::email_index(&normalize_email(login)))? {
                Some(id) => id,
                None => normalize_user_id(login),
            };

        let user: UserRecord =
            kv::get(&table, &keys::user_record(&user_id))?.ok_or(AppError::UserNotFound)?;
        if user.user_id != user_id {
            return Err(AppError::UserNotFound);
        }

        if !security::verify_password(&self.salt_key, password, &user.password_hash) {
            tracing::warn!("Invalid password for user {}", user.user_id);
            return Err(AppError::InvalidPassword);
        }
        Ok(user)
    }

    /// Load, mutate and persist a user record in one transaction.
    ///
    /// The only sanctioned path for partial updates: when the mutation
    /// changes the email, the old index entry is removed and the new one
    /// inserted atomically with the record write. A mutator error aborts the
    /// transaction, leaving record and index untouched.
    pub fn do_with_user<F>(&self, user_id: &str, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut UserRecord) -> Result<()>,
    {
        let user_id = normalize_user_id(user_id);
        if user_id.is_empty() {
            return Err(AppError::InvalidInput(ERR_EMPTY_USER_ID.to_string()));
        }

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(tables::HOST)?;
            let mut user = Self::load_user(&table, &user_id)?;
            let saved_email = user.email.clone();

            mutate(&mut user)?;

            if user.user_id != user_id {
                return Err(AppError::InvalidInput(
                    "user id is immutable".to_string(),
                ));
            }

            user.email = normalize_email(&user.email);
            if user.email.is_empty() {
                return Err(AppError::InvalidInput(ERR_EMPTY_EMAIL.to_string()));
            }

            if user.email != saved_email {
                // The new email must not already belong to another user
                if let Some(existing) =
                    kv::get::<String, _>(&table, &keys::email_index(&user.email))?
                {
                    if existing != user_id {
                        return Err(AppError::UserAlreadyExists);
                    }
                }
                kv::put(&mut table, &keys::email_index(&user.email), &user_id)?;
                kv::delete(&mut table, &keys::email_index(&saved_email))?;
            }

            kv::put(&mut table, &keys::user_record(&user_id), &user)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Replace a user's password hash, resolving the account by email.
    /// Returns the user id.
    pub fn reset_password(&self, email: &str, new_password: &str) -> Result<String> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AppError::InvalidInput(ERR_EMPTY_EMAIL.to_string()));
        }
        if new_password.is_empty() {
            return Err(AppError::InvalidInput(ERR_EMPTY_PASSWORD.to_string()));
        }

        let user_id = self.get_user_id_by_email(&email)?;
        self.do_with_user(&user_id, |user| {
            user.password_hash = security::hash_password(&self.salt_key, new_password);
            Ok(())
        })?;
        Ok(user_id)
    }

    /// Delete the primary record, back-reference and email index entry in one
    /// transaction. Fails with `UserNotFound` if the user does not exist.
    pub fn remove_user(&self, user_id: &str) -> Result<()> {
        let user_id = normalize_user_id(user_id);
        if user_id.is_empty() {
            return Err(AppError::InvalidInput(ERR_EMPTY_USER_ID.to_string()));
        }

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(tables::HOST)?;
            let user = Self::load_user(&table, &user_id)?;

            kv::delete(&mut table, &keys::user_record(&user_id))?;
            kv::delete(&mut table, &keys::user_back_ref(&user_id))?;
            kv::delete(&mut table, &keys::email_index(&user.email))?;
        }
        txn.commit()?;

        tracing::info!("Removed user {}", user_id);
        Ok(())
    }

    /// Best-effort bulk removal of every key under the user's namespace.
    ///
    /// Not transactional; call only after `remove_user` has succeeded.
    /// Partial completion leaves the keyspace valid.
    pub fn drop_user_content(&self, user_id: &str) -> Result<()> {
        let user_id = normalize_user_id(user_id);
        if user_id.is_empty() {
            return Err(AppError::InvalidInput(ERR_EMPTY_USER_ID.to_string()));
        }
        let removed = kv::sweep_prefix(&self.db, &keys::user_prefix(&user_id))?;
        tracing::info!("Dropped {} keys under user {}", removed, user_id);
        Ok(())
    }

    /// Visit every user record reachable from a back-reference.
    ///
    /// A back-reference whose primary record is missing is skipped with a
    /// warning rather than failing the enumeration.
    pub fn enum_users<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(UserRecord) -> bool,
    {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(tables::HOST)?;
        kv::scan_prefix(&table, keys::USER_BACK_REF_PREFIX, |key, payload| {
            let user_id: String = kv::decode(payload)?;
            match kv::get::<UserRecord, _>(&table, &keys::user_record(&user_id))? {
                Some(user) => Ok(visit(user)),
                None => {
                    tracing::warn!(
                        "Back-reference '{}' has no user record, skipping",
                        key
                    );
                    Ok(true)
                }
            }
        })
    }

    /// Visit every raw entry under the user's namespace, in key order.
    pub fn dump_user<F>(&self, user_id: &str, mut visit: F) -> Result<()>
    where
        F: FnMut(&str, &[u8]) -> bool,
    {
        let user_id = normalize_user_id(user_id);
        if user_id.is_empty() {
            return Err(AppError::InvalidInput(ERR_EMPTY_USER_ID.to_string()));
        }
        let txn = self.db.begin_read()?;
        let table = txn.open_table(tables::HOST)?;
        kv::scan_prefix(&table, &keys::user_prefix(&user_id), |key, payload| {
            Ok(visit(key, payload))
        })
    }

    /// Store a recover code for a login, overwriting any live one.
    ///
    /// The slot expires after the configured TTL; there is at most one live
    /// code per login at a time.
    pub fn save_recover_code(&self, email: &str, code: &str, remote_ip: &str) -> Result<RecoverCode> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AppError::InvalidInput(ERR_EMPTY_EMAIL.to_string()));
        }
        let code = normalize_code(code);
        if code.is_empty() {
            return Err(AppError::InvalidInput("recover code is empty".to_string()));
        }

        let rc = RecoverCode {
            code,
            remote_ip: remote_ip.to_string(),
            created_at: Utc::now().timestamp(),
        };

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(tables::HOST)?;
            kv::put_with_ttl(
                &mut table,
                &keys::recover_code(&email),
                &rc,
                self.recover_code_ttl_secs,
            )?;
        }
        txn.commit()?;
        Ok(rc)
    }

    /// Check a recover code for a login.
    ///
    /// Fails with `InvalidRecoverCode` on mismatch, absence or expiry. The
    /// code is not consumed on success; it stays valid until its TTL lapses
    /// or the caller overwrites it.
    pub fn validate_recover_code(&self, email: &str, code: &str) -> Result<()> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AppError::InvalidInput(ERR_EMPTY_EMAIL.to_string()));
        }
        let code = normalize_code(code);
        if code.is_empty() {
            return Err(AppError::InvalidInput("recover code is empty".to_string()));
        }

        let txn = self.db.begin_read()?;
        let table = txn.open_table(tables::HOST)?;
        let rc: RecoverCode = kv::get(&table, &keys::recover_code(&email))?
            .ok_or(AppError::InvalidRecoverCode)?;
        if rc.code != code {
            return Err(AppError::InvalidRecoverCode);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_id_digits() {
        assert_eq!(encode_id(0), "0");
        assert_eq!(encode_id(9), "9");
        assert_eq!(encode_id(10), "a");
        assert_eq!(encode_id(35), "z");
        assert_eq!(encode_id(36), "A");
        assert_eq!(encode_id(61), "Z");
        assert_eq!(encode_id(62), "10");
    }

    #[test]
    fn test_encode_id_sequence_seed() {
        assert_eq!(encode_id(27_483_984_961), "u00001");
        assert_eq!(encode_id(27_483_984_962), "u00002");
        assert_eq!(encode_id(27_483_984_961 + 62), "u00011");
    }

    #[test]
    fn test_encode_id_survives_normalization() {
        let id = encode_id(27_483_984_961);
        assert_eq!(normalize_user_id(&id), id);
    }
}
