//! Key builders for the host keyspace. Inputs must already be normalized;
//! normalized identifiers never contain the `:` separator.

/// Sequence counter for user-id generation
pub const USER_NEXT_ID: &str = "user-next-id";

/// Per-deployment password salt key slot
pub const USER_SALT_KEY: &str = "user-salt-key";

/// Prefix under which all back-references live
pub const USER_BACK_REF_PREFIX: &str = "user:";

/// Prefix under which all page records live
pub const PAGE_PREFIX: &str = "page:";

/// Primary user record
pub fn user_record(user_id: &str) -> String {
    format!("{user_id}:user")
}

/// Back-reference existence marker
pub fn user_back_ref(user_id: &str) -> String {
    format!("user:{user_id}")
}

/// Email secondary index entry
pub fn email_index(email: &str) -> String {
    format!("email:{email}")
}

/// Single recover-code slot for a login
pub fn recover_code(email: &str) -> String {
    format!("recover:email:{email}")
}

/// Page record
pub fn page(name: &str) -> String {
    format!("page:{name}")
}

/// Everything owned by one user
pub fn user_prefix(user_id: &str) -> String {
    format!("{user_id}:")
}

/// One security log entry; `timestamp_key` is the formatted millisecond slot
pub fn security_log(user_id: &str, timestamp_key: &str) -> String {
    format!("{user_id}:user:security-log:{timestamp_key}")
}

/// Prefix of one user's security log
pub fn security_log_prefix(user_id: &str) -> String {
    format!("{user_id}:user:security-log:")
}
