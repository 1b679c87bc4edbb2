use serde::{Deserialize, Serialize};

use crate::models::UserId;

/// Public/private dimension of a listing query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    PublicOnly,
    PrivateOnly,
    #[default]
    Any,
}

impl Visibility {
    /// The `public` column value to match, or `None` for no restriction.
    pub fn as_public_flag(self) -> Option<bool> {
        match self {
            Visibility::PublicOnly => Some(true),
            Visibility::PrivateOnly => Some(false),
            Visibility::Any => None,
        }
    }
}

/// Listing filter: visibility and owner scope, ANDed together.
/// Expiry is always applied on top and is not part of the filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityFilter {
    pub visibility: Visibility,
    pub owner: Option<UserId>,
}

impl VisibilityFilter {
    /// Every entry from every owner. Only meant for operators; web callers
    /// should use one of the narrower constructors.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// All public entries from all owners.
    pub fn public() -> Self {
        Self {
            visibility: Visibility::PublicOnly,
            owner: None,
        }
    }

    /// Everything `owner` has, regardless of visibility.
    pub fn owned_by(owner: UserId) -> Self {
        Self {
            visibility: Visibility::Any,
            owner: Some(owner),
        }
    }

    pub fn owned_public(owner: UserId) -> Self {
        Self {
            visibility: Visibility::PublicOnly,
            owner: Some(owner),
        }
    }

    pub fn owned_private(owner: UserId) -> Self {
        Self {
            visibility: Visibility::PrivateOnly,
            owner: Some(owner),
        }
    }

    pub fn public_flag(&self) -> Option<bool> {
        self.visibility.as_public_flag()
    }
}
