//! Entry repository: CRUD plus paginated, visibility-filtered listings.
//!
//! Expiry is enforced lazily: every read and write compares `expires`
//! against the clock, and nothing ever sweeps expired rows away.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as TimeDelta, Utc};
use noter_db::models::{EntryChanges, NewEntryRow};
use noter_db::time::format_timestamp;
use noter_db::{Database, Deadline};
use noter_types::{EntryWithOwner, PageResult, UserId, VisibilityFilter};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::access;
use crate::clock::Clock;
use crate::error::{NoterError, Result};

/// How many entries `latest` returns.
pub const LATEST_LIMIT: u32 = 10;
/// Longer lifetimes are clamped so expiry stays within four-digit years.
pub const MAX_TTL_DAYS: u32 = 36_500;

/// Owner-supplied fields of an entry, used for both create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    pub title: String,
    pub body: String,
    /// Lifetime in days, counted from the moment of the write.
    pub ttl_days: u32,
    pub is_public: bool,
}

#[derive(Clone)]
pub struct EntryRepository {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    deadline: Deadline,
}

impl EntryRepository {
    pub fn new(db: Arc<Database>, clock: Arc<dyn Clock>, timeout: Duration) -> Self {
        Self {
            db,
            clock,
            timeout,
            deadline: Deadline::none(),
        }
    }

    /// A copy of this repository whose calls also give up at `deadline`.
    pub fn with_deadline(&self, deadline: Deadline) -> Self {
        Self {
            deadline,
            ..self.clone()
        }
    }

    fn deadline(&self) -> Deadline {
        self.deadline.min(Deadline::after(self.timeout))
    }

    /// Stores a new entry and returns its id. Not idempotent: a retry after
    /// a timeout may create a second entry.
    pub fn create(&self, draft: &EntryDraft, owner_id: UserId) -> Result<Uuid> {
        let id = Uuid::now_v7();
        let now = self.clock.now();
        let id_text = id.to_string();
        let created = format_timestamp(now);
        let expires = format_timestamp(expiry_from(now, draft.ttl_days));

        self.db
            .insert_entry(
                self.deadline(),
                &NewEntryRow {
                    id: &id_text,
                    title: &draft.title,
                    body: &draft.body,
                    created: &created,
                    expires: &expires,
                    public: draft.is_public,
                    owner_id,
                },
            )
            .map_err(storage_failure("create entry"))?;

        info!(entry_id = %id, owner_id, public = draft.is_public, "Entry created");
        Ok(id)
    }

    /// Rewrites an entry the requester owns and restarts its expiry window
    /// from now. Missing, expired and foreign entries all give `NotFound`.
    pub fn update(&self, id: &str, draft: &EntryDraft, requester: UserId) -> Result<Uuid> {
        let Some(entry_id) = parse_entry_id(id) else {
            return Err(NoterError::NotFound);
        };
        let now = self.clock.now();
        let now_text = format_timestamp(now);
        let expires = format_timestamp(expiry_from(now, draft.ttl_days));

        let changed = self
            .db
            .update_entry(
                self.deadline(),
                &entry_id.to_string(),
                requester,
                &now_text,
                &EntryChanges {
                    title: &draft.title,
                    body: &draft.body,
                    expires: &expires,
                    public: draft.is_public,
                },
            )
            .map_err(storage_failure("update entry"))?;

        if changed == 0 {
            debug!(entry_id = %entry_id, requester, "Update matched no owned entry");
            return Err(NoterError::NotFound);
        }

        info!(entry_id = %entry_id, requester, "Entry updated");
        Ok(entry_id)
    }

    /// Fetches one entry if it is unexpired and the requester may see it.
    pub fn get(&self, id: &str, requester: Option<UserId>) -> Result<EntryWithOwner> {
        let Some(entry_id) = parse_entry_id(id) else {
            return Err(NoterError::NotFound);
        };
        let now = self.clock.now();

        let row = self
            .db
            .get_entry(self.deadline(), &entry_id.to_string(), &format_timestamp(now))
            .map_err(storage_failure("get entry"))?
            .ok_or(NoterError::NotFound)?;
        let found = row.into_model().map_err(storage_failure("decode entry"))?;

        if !access::is_visible(&found.entry, requester, now) {
            debug!(entry_id = %entry_id, ?requester, "Entry hidden from requester");
            return Err(NoterError::NotFound);
        }
        Ok(found)
    }

    /// The most recent unexpired public entries, newest first.
    pub fn latest(&self) -> Result<Vec<EntryWithOwner>> {
        let now = format_timestamp(self.clock.now());
        let rows = self
            .db
            .latest_public_entries(self.deadline(), &now, LATEST_LIMIT)
            .map_err(storage_failure("latest entries"))?;
        decode_rows(rows)
    }

    /// One page of unexpired entries matching `filter`, newest first.
    ///
    /// Fetches `limit + 1` rows so `has_next` needs no separate count.
    /// A `page` below 1 or a zero `limit` yields an empty last page.
    pub fn get_by_page(
        &self,
        page: u32,
        limit: u32,
        filter: &VisibilityFilter,
    ) -> Result<PageResult<EntryWithOwner>> {
        if page == 0 || limit == 0 {
            return Ok(PageResult::empty());
        }
        let offset = u64::from(page - 1) * u64::from(limit);
        let now = format_timestamp(self.clock.now());

        let rows = self
            .db
            .list_entries(self.deadline(), &now, filter, limit.saturating_add(1), offset)
            .map_err(storage_failure("list entries"))?;
        let page = PageResult::from_overfetch(decode_rows(rows)?, limit as usize);

        debug!(
            ?filter,
            offset,
            returned = page.len(),
            has_next = page.has_next,
            "Listed entries"
        );
        Ok(page)
    }

    /// Number of unexpired entries matching `filter`.
    pub fn count(&self, filter: &VisibilityFilter) -> Result<u64> {
        let now = format_timestamp(self.clock.now());
        self.db
            .count_entries(self.deadline(), &now, filter)
            .map_err(storage_failure("count entries"))
    }

    /// Pages needed to show every match at `limit` per page.
    pub fn total_pages(&self, limit: u32, filter: &VisibilityFilter) -> Result<u64> {
        if limit == 0 {
            return Ok(0);
        }
        Ok(self.count(filter)?.div_ceil(u64::from(limit)))
    }

    /// Removes an unexpired entry the requester owns. Anything else,
    /// including an id that never existed, is `NotFound`.
    pub fn delete(&self, id: &str, requester: UserId) -> Result<()> {
        let Some(entry_id) = parse_entry_id(id) else {
            return Err(NoterError::NotFound);
        };
        let now = format_timestamp(self.clock.now());

        let removed = self
            .db
            .delete_entry(self.deadline(), &entry_id.to_string(), requester, &now)
            .map_err(storage_failure("delete entry"))?;

        if removed == 0 {
            debug!(entry_id = %entry_id, requester, "Delete matched no owned entry");
            return Err(NoterError::NotFound);
        }

        info!(entry_id = %entry_id, requester, "Entry deleted");
        Ok(())
    }
}

fn expiry_from(now: DateTime<Utc>, ttl_days: u32) -> DateTime<Utc> {
    now + TimeDelta::days(i64::from(ttl_days.min(MAX_TTL_DAYS)))
}

/// Ids that are not UUIDs cannot name a stored entry.
fn parse_entry_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id.trim()).ok()
}

fn decode_rows(rows: Vec<noter_db::models::EntryRow>) -> Result<Vec<EntryWithOwner>> {
    rows.into_iter()
        .map(|row| row.into_model().map_err(storage_failure("decode entry")))
        .collect()
}

fn storage_failure(op: &'static str) -> impl Fn(noter_db::DbError) -> NoterError {
    move |e| {
        warn!("{op} failed: {e}");
        NoterError::Storage(e)
    }
}
