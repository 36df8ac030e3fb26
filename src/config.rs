use std::env;

use crate::constants::{
    DEFAULT_INITIAL_USER_ID, DEFAULT_RECOVER_CODE_TTL_SECS, DEFAULT_SECURITY_LOG_TTL_SECS,
    DEFAULT_TXN_RETRY_ATTEMPTS,
};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    /// Per-deployment password salt key. When `None`, a key is generated on
    /// first boot and persisted in the store.
    pub user_salt_key: Option<String>,
    /// Seed for the user-id sequence counter
    pub initial_user_id: u64,
    pub security_log_ttl_secs: i64,
    pub recover_code_ttl_secs: i64,
    /// Attempt budget callers should pass to the conflict-retry helper
    pub txn_retry_attempts: u32,
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        let database_path =
            env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/identity.db".to_string());

        let user_salt_key = env::var("USER_SALT_KEY").ok().filter(|s| !s.is_empty());

        let initial_user_id = env::var("INITIAL_USER_ID")
            .unwrap_or_else(|_| DEFAULT_INITIAL_USER_ID.to_string())
            .parse()
            .map_err(|_| "Invalid INITIAL_USER_ID")?;

        let security_log_ttl_secs = env::var("SECURITY_LOG_TTL_SECS")
            .unwrap_or_else(|_| DEFAULT_SECURITY_LOG_TTL_SECS.to_string())
            .parse()
            .map_err(|_| "Invalid SECURITY_LOG_TTL_SECS")?;

        let recover_code_ttl_secs = env::var("RECOVER_CODE_TTL_SECS")
            .unwrap_or_else(|_| DEFAULT_RECOVER_CODE_TTL_SECS.to_string())
            .parse()
            .map_err(|_| "Invalid RECOVER_CODE_TTL_SECS")?;

        let txn_retry_attempts = env::var("TXN_RETRY_ATTEMPTS")
            .unwrap_or_else(|_| DEFAULT_TXN_RETRY_ATTEMPTS.to_string())
            .parse()
            .map_err(|_| "Invalid TXN_RETRY_ATTEMPTS")?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        Ok(Config {
            database_path,
            user_salt_key,
            initial_user_id,
            security_log_ttl_secs,
            recover_code_ttl_secs,
            txn_retry_attempts,
            environment,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: "./data/identity.db".to_string(),
            user_salt_key: None,
            initial_user_id: DEFAULT_INITIAL_USER_ID,
            security_log_ttl_secs: DEFAULT_SECURITY_LOG_TTL_SECS,
            recover_code_ttl_secs: DEFAULT_RECOVER_CODE_TTL_SECS,
            txn_retry_attempts: DEFAULT_TXN_RETRY_ATTEMPTS,
            environment: "development".to_string(),
        }
    }
}
