//! Timestamp encoding for TEXT columns.
//!
//! Fixed-width RFC 3339 in UTC with microseconds, so string order is time
//! order and `expires > ?` comparisons work directly in SQL.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{DbError, DbResult};

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DbError::InvalidRow(format!("bad timestamp {raw:?}: {e}")))
}
