//! Owner-or-public read rule.
//!
//! Update and delete scope by `owner_id` in their WHERE clause instead.

use chrono::{DateTime, Utc};
use noter_types::{Entry, UserId};

/// Whether `requester` may read `entry`, ignoring expiry.
/// Anonymous requesters only ever see public entries.
pub fn can_view(entry: &Entry, requester: Option<UserId>) -> bool {
    entry.is_public || requester.is_some_and(|id| entry.is_owned_by(id))
}

/// Read check including expiry.
pub fn is_visible(entry: &Entry, requester: Option<UserId>, now: DateTime<Utc>) -> bool {
    !entry.is_expired_at(now) && can_view(entry, requester)
}
