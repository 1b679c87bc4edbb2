use noter_types::{UserId, VisibilityFilter};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use crate::models::{EntryChanges, EntryRow, NewEntryRow};
use crate::{Database, Deadline, DbResult};

const ENTRY_COLUMNS: &str = "e.id, e.title, e.body, e.created, e.expires, e.public, e.owner_id, u.name AS owner_name";

impl Database {
    pub fn insert_entry(&self, deadline: Deadline, row: &NewEntryRow<'_>) -> DbResult<()> {
        self.with_conn_mut(deadline, |conn| {
            conn.execute(
                "INSERT INTO entries (id, title, body, created, expires, public, owner_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    row.id,
                    row.title,
                    row.body,
                    row.created,
                    row.expires,
                    row.public,
                    row.owner_id
                ],
            )?;
            Ok(())
        })
    }

    /// Rewrites an unexpired entry owned by `owner_id`. Returns rows changed.
    pub fn update_entry(
        &self,
        deadline: Deadline,
        id: &str,
        owner_id: UserId,
        now: &str,
        changes: &EntryChanges<'_>,
    ) -> DbResult<usize> {
        self.with_conn_mut(deadline, |conn| {
            let changed = conn.execute(
                "UPDATE entries
                 SET title = ?1, body = ?2, expires = ?3, public = ?4
                 WHERE id = ?5 AND owner_id = ?6 AND expires > ?7",
                params![
                    changes.title,
                    changes.body,
                    changes.expires,
                    changes.public,
                    id,
                    owner_id,
                    now
                ],
            )?;
            Ok(changed)
        })
    }

    /// Fetches an unexpired entry by id. Visibility is the caller's call.
    pub fn get_entry(&self, deadline: Deadline, id: &str, now: &str) -> DbResult<Option<EntryRow>> {
        self.with_conn(deadline, |conn| query_entry(conn, id, now))
    }

    pub fn latest_public_entries(
        &self,
        deadline: Deadline,
        now: &str,
        limit: u32,
    ) -> DbResult<Vec<EntryRow>> {
        self.with_conn(deadline, |conn| {
            query_entries(conn, now, &VisibilityFilter::public(), limit, 0)
        })
    }

    /// Filtered listing ordered by id descending.
    pub fn list_entries(
        &self,
        deadline: Deadline,
        now: &str,
        filter: &VisibilityFilter,
        limit: u32,
        offset: u64,
    ) -> DbResult<Vec<EntryRow>> {
        self.with_conn(deadline, |conn| query_entries(conn, now, filter, limit, offset))
    }

    pub fn count_entries(
        &self,
        deadline: Deadline,
        now: &str,
        filter: &VisibilityFilter,
    ) -> DbResult<u64> {
        self.with_conn(deadline, |conn| {
            let mut binds = vec![Value::Text(now.to_string())];
            let sql = format!(
                "SELECT COUNT(*) FROM entries e WHERE e.expires > ?{}",
                filter_clause(filter, &mut binds)
            );
            let count: i64 = conn.query_row(&sql, params_from_iter(binds), |r| r.get(0))?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
    }

    /// Deletes an unexpired entry owned by `owner_id`. Returns rows removed.
    pub fn delete_entry(
        &self,
        deadline: Deadline,
        id: &str,
        owner_id: UserId,
        now: &str,
    ) -> DbResult<usize> {
        self.with_conn_mut(deadline, |conn| {
            let removed = conn.execute(
                "DELETE FROM entries WHERE id = ?1 AND owner_id = ?2 AND expires > ?3",
                params![id, owner_id, now],
            )?;
            Ok(removed)
        })
    }
}

/// Appends the optional owner and public/private predicates to a WHERE
/// clause, pushing their bind values in order.
fn filter_clause(filter: &VisibilityFilter, binds: &mut Vec<Value>) -> String {
    let mut sql = String::new();
    if let Some(owner) = filter.owner {
        sql.push_str(" AND e.owner_id = ?");
        binds.push(Value::Integer(owner));
    }
    if let Some(public) = filter.public_flag() {
        sql.push_str(" AND e.public = ?");
        binds.push(Value::Integer(i64::from(public)));
    }
    sql
}

fn query_entry(conn: &Connection, id: &str, now: &str) -> DbResult<Option<EntryRow>> {
    let sql = format!(
        "SELECT {ENTRY_COLUMNS}
         FROM entries e
         JOIN users u ON e.owner_id = u.id
         WHERE e.id = ?1 AND e.expires > ?2"
    );
    let row = conn
        .query_row(&sql, params![id, now], EntryRow::from_row)
        .optional()?;
    Ok(row)
}

fn query_entries(
    conn: &Connection,
    now: &str,
    filter: &VisibilityFilter,
    limit: u32,
    offset: u64,
) -> DbResult<Vec<EntryRow>> {
    let mut binds = vec![Value::Text(now.to_string())];
    let mut sql = format!(
        "SELECT {ENTRY_COLUMNS}
         FROM entries e
         JOIN users u ON e.owner_id = u.id
         WHERE e.expires > ?"
    );
    sql.push_str(&filter_clause(filter, &mut binds));
    sql.push_str(" ORDER BY e.id DESC LIMIT ? OFFSET ?");
    binds.push(Value::Integer(i64::from(limit)));
    binds.push(Value::Integer(i64::try_from(offset).unwrap_or(i64::MAX)));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(binds), EntryRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
