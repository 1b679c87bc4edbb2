use rusqlite::Connection;
use tracing::info;

use crate::error::DbResult;

pub const LATEST_VERSION: i64 = 1;

pub fn run(conn: &Connection) -> DbResult<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version = current_version(conn)?;

    if version < 1 {
        info!("Running migration v1 (users, entries)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL,
                email           TEXT NOT NULL,
                password_hash   BLOB NOT NULL,
                created         TEXT NOT NULL,
                CONSTRAINT users_uc_email UNIQUE (email)
            );

            CREATE TABLE entries (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                body        TEXT NOT NULL,
                created     TEXT NOT NULL,
                expires     TEXT NOT NULL,
                public      INTEGER NOT NULL,
                owner_id    INTEGER NOT NULL REFERENCES users(id)
            );

            CREATE INDEX idx_entries_expires ON entries(expires);
            CREATE INDEX idx_entries_owner ON entries(owner_id, public);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete (schema v{})", current_version(conn)?);
    Ok(())
}

pub fn current_version(conn: &Connection) -> DbResult<i64> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;
    Ok(version)
}
