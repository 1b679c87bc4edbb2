pub mod deadline;
pub mod entries;
pub mod error;
pub mod migrations;
pub mod models;
pub mod time;
pub mod users;

pub use deadline::Deadline;
pub use error::{DbError, DbResult};

use rusqlite::{Connection, ErrorCode, OpenFlags};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

const READER_POOL_SIZE: usize = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
/// VM instructions between deadline checks.
const PROGRESS_INTERVAL: i32 = 1_000;
/// Pause between attempts to take a busy connection under a deadline.
const LOCK_RETRY: Duration = Duration::from_millis(1);

/// Shared handle to the relational store: one writer plus a small pool of
/// read-only connections. Safe to share across threads behind an `Arc`.
pub struct Database {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    reader_idx: AtomicUsize,
}

impl Database {
    pub fn open(path: &Path) -> DbResult<Self> {
        let writer = Connection::open(path)?;

        // WAL mode for concurrent reads
        writer.pragma_update(None, "journal_mode", "WAL")?;
        writer.pragma_update(None, "foreign_keys", "ON")?;
        writer.busy_timeout(BUSY_TIMEOUT)?;

        migrations::run(&writer)?;

        let mut readers = Vec::with_capacity(READER_POOL_SIZE);
        for _ in 0..READER_POOL_SIZE {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            readers.push(Mutex::new(conn));
        }

        info!(
            "Database opened at {} (1 writer + {} readers)",
            path.display(),
            READER_POOL_SIZE
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            reader_idx: AtomicUsize::new(0),
        })
    }

    /// A private in-memory database. Reads and writes share the single
    /// connection since in-memory databases cannot be opened twice.
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;

        Ok(Self {
            writer: Mutex::new(conn),
            readers: Vec::new(),
            reader_idx: AtomicUsize::new(0),
        })
    }

    /// Runs a read-only closure on a pooled reader connection.
    pub fn with_conn<F, T>(&self, deadline: Deadline, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T>,
    {
        if self.readers.is_empty() {
            return self.with_conn_mut(deadline, f);
        }
        let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        run_with_deadline(&self.readers[idx], deadline, f)
    }

    /// Runs a closure on the writer connection. Never retried on failure.
    pub fn with_conn_mut<F, T>(&self, deadline: Deadline, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T>,
    {
        run_with_deadline(&self.writer, deadline, f)
    }
}

fn run_with_deadline<F, T>(conn: &Mutex<Connection>, deadline: Deadline, f: F) -> DbResult<T>
where
    F: FnOnce(&Connection) -> DbResult<T>,
{
    let conn = lock_before(conn, deadline)?;

    if let Some(at) = deadline.instant() {
        let remaining = at.saturating_duration_since(Instant::now());
        conn.busy_timeout(remaining.min(BUSY_TIMEOUT))?;
        conn.progress_handler(PROGRESS_INTERVAL, Some(move || Instant::now() >= at));
    }
    let result = f(&conn);
    if deadline.instant().is_some() {
        conn.progress_handler(0, None::<fn() -> bool>);
        conn.busy_timeout(BUSY_TIMEOUT)?;
    }

    result.map_err(|e| match e {
        DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _))
            if err.code == ErrorCode::OperationInterrupted =>
        {
            DbError::DeadlineExceeded
        }
        other => other,
    })
}

/// Takes the connection, giving up once `deadline` passes.
fn lock_before(
    conn: &Mutex<Connection>,
    deadline: Deadline,
) -> DbResult<MutexGuard<'_, Connection>> {
    if deadline.is_expired() {
        return Err(DbError::DeadlineExceeded);
    }
    if deadline.instant().is_none() {
        return conn.lock().map_err(|_| DbError::LockPoisoned);
    }
    loop {
        match conn.try_lock() {
            Ok(guard) => return Ok(guard),
            Err(TryLockError::Poisoned(_)) => return Err(DbError::LockPoisoned),
            Err(TryLockError::WouldBlock) => {
                if deadline.is_expired() {
                    return Err(DbError::DeadlineExceeded);
                }
                std::thread::sleep(LOCK_RETRY);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_database_serves_reads_from_pool() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("noter.db")).unwrap();

        db.with_conn_mut(Deadline::none(), |conn| {
            conn.execute(
                "INSERT INTO users (name, email, password_hash, created) VALUES ('a', 'a@x.io', x'00', '2024-01-01T00:00:00.000000Z')",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        for _ in 0..READER_POOL_SIZE + 1 {
            let count: i64 = db
                .with_conn(Deadline::none(), |conn| {
                    Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?)
                })
                .unwrap();
            assert_eq!(count, 1);
        }
    }

    #[test]
    fn readers_cannot_write() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("noter.db")).unwrap();

        let result = db.with_conn(Deadline::none(), |conn| {
            conn.execute("DELETE FROM users", [])?;
            Ok(())
        });
        assert!(matches!(result, Err(DbError::Sqlite(_))));
    }

    #[test]
    fn expired_deadline_is_rejected_before_running() {
        let db = Database::open_in_memory().unwrap();
        let past = Deadline::at(Instant::now() - Duration::from_millis(1));

        let mut ran = false;
        let result = db.with_conn(past, |_| {
            ran = true;
            Ok(())
        });
        assert!(matches!(result, Err(DbError::DeadlineExceeded)));
        assert!(!ran);
    }

    #[test]
    fn waiting_for_a_busy_connection_stops_at_deadline() {
        let db = Database::open_in_memory().unwrap();
        let (locked_tx, locked_rx) = std::sync::mpsc::channel();

        std::thread::scope(|s| {
            s.spawn(|| {
                db.with_conn_mut(Deadline::none(), |_| {
                    locked_tx.send(()).unwrap();
                    std::thread::sleep(Duration::from_millis(300));
                    Ok(())
                })
                .unwrap();
            });

            locked_rx.recv().unwrap();
            let started = Instant::now();
            let result = db.with_conn_mut(Deadline::after(Duration::from_millis(20)), |_| Ok(()));
            assert!(matches!(result, Err(DbError::DeadlineExceeded)));
            assert!(started.elapsed() < Duration::from_millis(250));
        });
    }

    #[test]
    fn long_statement_is_interrupted_at_deadline() {
        let db = Database::open_in_memory().unwrap();
        let deadline = Deadline::after(Duration::from_millis(20));

        let result = db.with_conn(deadline, |conn| {
            let n: i64 = conn.query_row(
                "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c)
                 SELECT COUNT(*) FROM c",
                [],
                |r| r.get(0),
            )?;
            Ok(n)
        });
        assert!(matches!(result, Err(DbError::DeadlineExceeded)));

        // The handler is removed afterwards, so later calls are unaffected.
        let ok: i64 = db
            .with_conn(Deadline::none(), |conn| {
                Ok(conn.query_row("SELECT 1", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(ok, 1);
    }
}
