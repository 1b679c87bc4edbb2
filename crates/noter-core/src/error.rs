use noter_db::DbError;

use crate::validation::FieldErrors;

pub type Result<T> = std::result::Result<T, NoterError>;

/// Error kinds surfaced to callers of the repository and identity manager.
///
/// `NotFound` deliberately covers missing, expired and not-yours alike, and
/// `InvalidCredentials` covers unknown user and wrong password alike.
#[derive(Debug, thiserror::Error)]
pub enum NoterError {
    #[error("no matching record found")]
    NotFound,
    #[error("email address is already in use")]
    DuplicateIdentity,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("storage failure: {0}")]
    Storage(#[from] DbError),
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
}

impl NoterError {
    /// Errors a web layer should render as a generic failure page rather
    /// than a targeted message.
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, NoterError::Storage(_) | NoterError::PasswordHash(_))
    }
}
