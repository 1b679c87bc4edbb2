use noter_types::UserId;
use rusqlite::{Connection, OptionalExtension, params};

use crate::models::{CredentialRow, UserRow};
use crate::{Database, Deadline, DbResult};

impl Database {
    /// Inserts a user and returns the assigned id. A duplicate email fails
    /// with a UNIQUE violation on `users.email`.
    pub fn insert_user(
        &self,
        deadline: Deadline,
        name: &str,
        email: &str,
        password_hash: &[u8],
        created: &str,
    ) -> DbResult<UserId> {
        self.with_conn_mut(deadline, |conn| {
            conn.execute(
                "INSERT INTO users (name, email, password_hash, created) VALUES (?1, ?2, ?3, ?4)",
                params![name, email, password_hash, created],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_id(&self, deadline: Deadline, id: UserId) -> DbResult<Option<UserRow>> {
        self.with_conn(deadline, |conn| query_user_by_id(conn, id))
    }

    pub fn get_credentials_by_email(
        &self,
        deadline: Deadline,
        email: &str,
    ) -> DbResult<Option<CredentialRow>> {
        self.with_conn(deadline, |conn| {
            let row = conn
                .query_row(
                    "SELECT id, password_hash FROM users WHERE email = ?1",
                    [email],
                    |row| {
                        Ok(CredentialRow {
                            id: row.get(0)?,
                            password_hash: row.get(1)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_credentials_by_id(
        &self,
        deadline: Deadline,
        id: UserId,
    ) -> DbResult<Option<CredentialRow>> {
        self.with_conn(deadline, |conn| {
            let row = conn
                .query_row(
                    "SELECT id, password_hash FROM users WHERE id = ?1",
                    [id],
                    |row| {
                        Ok(CredentialRow {
                            id: row.get(0)?,
                            password_hash: row.get(1)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn user_exists(&self, deadline: Deadline, id: UserId) -> DbResult<bool> {
        self.with_conn(deadline, |conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
                [id],
                |r| r.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Replaces the password hash only if it still equals `expected`.
    /// Returns rows changed; zero means the user is gone or the hash moved on.
    pub fn swap_password_hash(
        &self,
        deadline: Deadline,
        id: UserId,
        expected: &[u8],
        replacement: &[u8],
    ) -> DbResult<usize> {
        self.with_conn_mut(deadline, |conn| {
            let changed = conn.execute(
                "UPDATE users SET password_hash = ?1 WHERE id = ?2 AND password_hash = ?3",
                params![replacement, id, expected],
            )?;
            Ok(changed)
        })
    }

    pub fn count_users(&self, deadline: Deadline) -> DbResult<u64> {
        self.with_conn(deadline, |conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
    }
}

fn query_user_by_id(conn: &Connection, id: UserId) -> DbResult<Option<UserRow>> {
    let mut stmt = conn.prepare("SELECT id, name, email, created FROM users WHERE id = ?1")?;

    let row = stmt
        .query_row([id], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                created: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}
