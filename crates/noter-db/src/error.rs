use rusqlite::ErrorCode;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("storage deadline exceeded")]
    DeadlineExceeded,
    #[error("connection lock poisoned")]
    LockPoisoned,
    #[error("malformed row: {0}")]
    InvalidRow(String),
}

impl DbError {
    /// True when this error is a UNIQUE constraint violation on `table.column`.
    ///
    /// SQLite reports these as `SQLITE_CONSTRAINT_UNIQUE` with a message of
    /// the form `UNIQUE constraint failed: users.email`.
    pub fn is_unique_violation(&self, table: &str, column: &str) -> bool {
        let DbError::Sqlite(rusqlite::Error::SqliteFailure(err, Some(message))) = self else {
            return false;
        };
        if err.code != ErrorCode::ConstraintViolation
            || err.extended_code != rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        {
            return false;
        }
        let target = format!("{table}.{column}");
        message
            .rsplit(':')
            .next()
            .is_some_and(|cols| cols.split(',').any(|c| c.trim() == target))
    }
}
