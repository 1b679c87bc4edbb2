//! Core of the noter store: the entry repository and the identity manager.
//!
//! Both are synchronous, hold no mutable in-process state and share only
//! the `Database` handle the host injects. Every call may block on storage
//! and carries a deadline (see `noter_db::Deadline`).

pub mod access;
pub mod clock;
pub mod config;
pub mod error;
pub mod identity;
pub mod password;
pub mod repository;
pub mod validation;

use std::sync::Arc;
use std::time::Duration;

use noter_db::Database;
use tracing::info;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ConfigError};
pub use error::{NoterError, Result};
pub use identity::IdentityManager;
pub use noter_db::Deadline;
pub use password::{CredentialHasher, HashingParams};
pub use repository::{EntryDraft, EntryRepository};
pub use validation::FieldErrors;

/// Both components wired to one database. The components do not know
/// about each other; this is only a convenience for hosts.
#[derive(Clone)]
pub struct Noter {
    pub entries: EntryRepository,
    pub identity: IdentityManager,
    db: Arc<Database>,
}

impl Noter {
    /// Opens (and migrates) the database named in `config`.
    pub fn open(config: &Config) -> Result<Self> {
        let db = match &config.db_path {
            Some(path) => Database::open(path)?,
            None => Database::open_in_memory()?,
        };
        info!(
            in_memory = config.db_path.is_none(),
            timeout_ms = timeout_millis(config.query_timeout),
            "Store ready"
        );
        Self::with_database(Arc::new(db), config, Arc::new(SystemClock))
    }

    pub fn with_database(
        db: Arc<Database>,
        config: &Config,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Ok(Self {
            entries: EntryRepository::new(db.clone(), clock.clone(), config.query_timeout),
            identity: IdentityManager::new(
                db.clone(),
                clock,
                CredentialHasher::new(config.hashing),
                config.query_timeout,
            )?,
            db,
        })
    }

    pub fn schema_version(&self) -> Result<i64> {
        Ok(self
            .db
            .with_conn(Deadline::none(), noter_db::migrations::current_version)?)
    }
}

fn timeout_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_millis_saturates() {
        assert_eq!(timeout_millis(Duration::from_millis(250)), 250);
        assert_eq!(timeout_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn with_database_reports_bad_hash_params() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let mut config = Config::for_tests();
        config.hashing.memory_kib = 1;
        assert!(matches!(
            Noter::with_database(db, &config, Arc::new(SystemClock)),
            Err(NoterError::PasswordHash(_))
        ));
    }
}
