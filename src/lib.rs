//! Identity-and-audit data layer over an ordered, transactional key-value
//! store.
//!
//! The crate maintains user account records with a case-insensitive
//! unique-email constraint, generates collision-free sequential user ids,
//! keeps secondary indexes consistent under concurrent writers, and appends
//! a strictly-ordered per-user security event log keyed only by wall-clock
//! time. A content-page store shares the same patterns.

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod models;
pub mod normalize;
pub mod security;
pub mod store;

pub use config::Config;
pub use db::{open_database, Db};
pub use error::{with_conflict_retry, AppError, Result};
pub use store::{PageStore, SecurityLogStore, UserStore};

/// All stores opened over one shared database handle
pub struct Stores {
    pub users: UserStore,
    pub security_log: SecurityLogStore,
    pub pages: PageStore,
}

impl Stores {
    /// Open every store over the given database.
    ///
    /// Performs the one-time salt-key bootstrap when the configuration
    /// carries no salt key of its own.
    pub fn open(db: Db, config: &Config) -> Result<Self> {
        Ok(Self {
            users: UserStore::open(db.clone(), config)?,
            security_log: SecurityLogStore::new(db.clone(), config),
            pages: PageStore::new(db),
        })
    }
}
