use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Users are keyed by the integer the store assigns on insert.
pub type UserId = i64;

/// A single user-authored content record.
///
/// `id` is a UUIDv7, so sorting ids descending is recency order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_public: bool,
    pub owner_id: UserId,
}

impl Entry {
    /// An entry is expired once `now` reaches `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id == user_id
    }
}

/// Entry joined with its owner's display name, as returned by every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryWithOwner {
    #[serde(flatten)]
    pub entry: Entry,
    pub owner_name: String,
}

/// Public view of an account. The password hash never leaves the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// One page of results plus whether another page follows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub has_next: bool,
}

impl<T> PageResult<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            has_next: false,
        }
    }

    /// Builds a page from a "fetch one extra" query result: `rows` may hold
    /// up to `limit + 1` items, the surplus only signals a following page.
    pub fn from_overfetch(mut rows: Vec<T>, limit: usize) -> Self {
        let has_next = rows.len() > limit;
        rows.truncate(limit);
        Self {
            items: rows,
            has_next,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_entry(expires_at: DateTime<Utc>) -> Entry {
        Entry {
            id: Uuid::now_v7(),
            title: "title".into(),
            body: "body".into(),
            created_at: Utc::now(),
            expires_at,
            is_public: true,
            owner_id: 7,
        }
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let now = Utc::now();
        let entry = sample_entry(now);
        assert!(entry.is_expired_at(now));
        assert!(!entry.is_expired_at(now - Duration::seconds(1)));
    }

    #[test]
    fn overfetch_sets_has_next_and_truncates() {
        let page = PageResult::from_overfetch(vec![1, 2, 3, 4], 3);
        assert_eq!(page.items, vec![1, 2, 3]);
        assert!(page.has_next);

        let page = PageResult::from_overfetch(vec![1, 2, 3], 3);
        assert_eq!(page.len(), 3);
        assert!(!page.has_next);
    }

    #[test]
    fn entry_with_owner_serializes_flat() {
        let view = EntryWithOwner {
            entry: sample_entry(Utc::now()),
            owner_name: "alice".into(),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["owner_name"], "alice");
        assert_eq!(json["owner_id"], 7);
        assert_eq!(json["title"], "title");
    }
}
