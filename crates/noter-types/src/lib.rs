//! Shared data model for the noter store.
//!
//! Plain values only: nothing in here touches storage or hashing, so the
//! same types can be handed to a web layer, the CLI, or tests.

pub mod filter;
pub mod models;

pub use filter::{Visibility, VisibilityFilter};
pub use models::{Entry, EntryWithOwner, PageResult, UserId, UserProfile};
