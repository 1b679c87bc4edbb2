//! Database row types. These map directly to SQLite rows and are converted
//! into `noter-types` models at the edge of this crate.

use noter_types::{Entry, EntryWithOwner, UserId, UserProfile};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::time::parse_timestamp;

/// An `entries` row joined with the owner's name.
pub struct EntryRow {
    pub id: String,
    pub title: String,
    pub body: String,
    pub created: String,
    pub expires: String,
    pub public: bool,
    pub owner_id: UserId,
    pub owner_name: String,
}

impl EntryRow {
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            body: row.get("body")?,
            created: row.get("created")?,
            expires: row.get("expires")?,
            public: row.get("public")?,
            owner_id: row.get("owner_id")?,
            owner_name: row.get("owner_name")?,
        })
    }

    pub fn into_model(self) -> DbResult<EntryWithOwner> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| DbError::InvalidRow(format!("bad entry id {:?}: {e}", self.id)))?;
        Ok(EntryWithOwner {
            entry: Entry {
                id,
                title: self.title,
                body: self.body,
                created_at: parse_timestamp(&self.created)?,
                expires_at: parse_timestamp(&self.expires)?,
                is_public: self.public,
                owner_id: self.owner_id,
            },
            owner_name: self.owner_name,
        })
    }
}

/// Values for a fresh `entries` insert; timestamps already encoded.
pub struct NewEntryRow<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub body: &'a str,
    pub created: &'a str,
    pub expires: &'a str,
    pub public: bool,
    pub owner_id: UserId,
}

/// Owner-editable columns of an entry.
pub struct EntryChanges<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub expires: &'a str,
    pub public: bool,
}

/// `users` row without the credential column.
pub struct UserRow {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created: String,
}

impl UserRow {
    pub fn into_model(self) -> DbResult<UserProfile> {
        Ok(UserProfile {
            id: self.id,
            name: self.name,
            email: self.email,
            created_at: parse_timestamp(&self.created)?,
        })
    }
}

/// Just what credential checks need.
pub struct CredentialRow {
    pub id: UserId,
    pub password_hash: Vec<u8>,
}
