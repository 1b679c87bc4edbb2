//! Identity manager: account creation, credential checks and password
//! rotation.
//!
//! A credential only ever moves `{none} -> hashed` (sign-up) and
//! `hashed -> hashed` (verified rotation). There is no lockout state.

use std::sync::Arc;
use std::time::Duration;

use noter_db::time::format_timestamp;
use noter_db::{Database, DbError, Deadline};
use noter_types::{UserId, UserProfile};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{NoterError, Result};
use crate::password::CredentialHasher;

/// Verified against when the email is unknown, so both failure paths run
/// the same Argon2 comparison.
const DUMMY_PASSWORD: &str = "noter-timing-equaliser";

#[derive(Clone)]
pub struct IdentityManager {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
    hasher: CredentialHasher,
    timeout: Duration,
    deadline: Deadline,
    dummy_hash: Arc<[u8]>,
}

impl IdentityManager {
    /// Hashes the dummy password up front, so a miss never pays for a
    /// hash that a wrong-password attempt would not.
    pub fn new(
        db: Arc<Database>,
        clock: Arc<dyn Clock>,
        hasher: CredentialHasher,
        timeout: Duration,
    ) -> Result<Self> {
        let dummy_hash = Arc::from(hasher.hash(DUMMY_PASSWORD)?);
        Ok(Self {
            db,
            clock,
            hasher,
            timeout,
            deadline: Deadline::none(),
            dummy_hash,
        })
    }

    /// A copy of this manager whose calls also give up at `deadline`.
    pub fn with_deadline(&self, deadline: Deadline) -> Self {
        Self {
            deadline,
            ..self.clone()
        }
    }

    fn deadline(&self) -> Deadline {
        self.deadline.min(Deadline::after(self.timeout))
    }

    /// Creates an account. A taken email is reported by the store's unique
    /// constraint, so there is no check-then-insert window.
    pub fn sign_up(&self, name: &str, email: &str, password: &str) -> Result<UserId> {
        let hash = self.hasher.hash(password)?;
        let created = format_timestamp(self.clock.now());

        match self
            .db
            .insert_user(self.deadline(), name, email, &hash, &created)
        {
            Ok(id) => {
                info!(user_id = id, "User signed up");
                Ok(id)
            }
            Err(e) if e.is_unique_violation("users", "email") => {
                debug!("Sign-up rejected: email already registered");
                Err(NoterError::DuplicateIdentity)
            }
            Err(e) => Err(storage_failure("sign up", e)),
        }
    }

    /// Returns the user id for a matching email and password. Unknown email
    /// and wrong password are the same `InvalidCredentials`.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<UserId> {
        let creds = self
            .db
            .get_credentials_by_email(self.deadline(), email)
            .map_err(|e| storage_failure("authenticate", e))?;

        let Some(creds) = creds else {
            self.burn_verification(password)?;
            debug!("Authentication failed");
            return Err(NoterError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &creds.password_hash)? {
            debug!("Authentication failed");
            return Err(NoterError::InvalidCredentials);
        }

        debug!(user_id = creds.id, "Authenticated");
        Ok(creds.id)
    }

    pub fn get_by_id(&self, id: UserId) -> Result<UserProfile> {
        let row = self
            .db
            .get_user_by_id(self.deadline(), id)
            .map_err(|e| storage_failure("get user", e))?
            .ok_or(NoterError::NotFound)?;
        row.into_model().map_err(|e| storage_failure("decode user", e))
    }

    pub fn exists(&self, id: UserId) -> Result<bool> {
        self.db
            .user_exists(self.deadline(), id)
            .map_err(|e| storage_failure("user exists", e))
    }

    pub fn count(&self) -> Result<u64> {
        self.db
            .count_users(self.deadline())
            .map_err(|e| storage_failure("count users", e))
    }

    /// Replaces the password after re-verifying the current one. The write
    /// only lands if the stored hash is still the one just verified, so two
    /// racing rotations cannot both succeed.
    pub fn change_password(
        &self,
        id: UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let creds = self
            .db
            .get_credentials_by_id(self.deadline(), id)
            .map_err(|e| storage_failure("change password", e))?;

        let Some(creds) = creds else {
            self.burn_verification(current_password)?;
            debug!(user_id = id, "Password change rejected");
            return Err(NoterError::InvalidCredentials);
        };

        if !self.hasher.verify(current_password, &creds.password_hash)? {
            debug!(user_id = id, "Password change rejected");
            return Err(NoterError::InvalidCredentials);
        }

        let replacement = self.hasher.hash(new_password)?;
        let changed = self
            .db
            .swap_password_hash(self.deadline(), id, &creds.password_hash, &replacement)
            .map_err(|e| storage_failure("change password", e))?;

        if changed == 0 {
            debug!(user_id = id, "Password changed concurrently");
            return Err(NoterError::InvalidCredentials);
        }

        info!(user_id = id, "Password changed");
        Ok(())
    }

    /// Runs one verification against the dummy hash and discards the result.
    fn burn_verification(&self, password: &str) -> Result<()> {
        self.hasher.verify(password, &self.dummy_hash)?;
        Ok(())
    }
}

fn storage_failure(op: &str, e: DbError) -> NoterError {
    warn!("{op} failed: {e}");
    NoterError::Storage(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::password::HashingParams;

    fn manager() -> IdentityManager {
        let db = Arc::new(Database::open_in_memory().unwrap());
        IdentityManager::new(
            db,
            Arc::new(SystemClock),
            CredentialHasher::new(HashingParams::cheap()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn sign_up_then_authenticate() {
        let ids = manager();
        let id = ids.sign_up("Ann", "ann@example.com", "hunter22").unwrap();

        assert_eq!(ids.authenticate("ann@example.com", "hunter22").unwrap(), id);
        let profile = ids.get_by_id(id).unwrap();
        assert_eq!(profile.name, "Ann");
        assert_eq!(profile.email, "ann@example.com");
    }

    #[test]
    fn duplicate_email_keeps_first_account() {
        let ids = manager();
        let first = ids.sign_up("Ann", "ann@example.com", "hunter22").unwrap();

        let err = ids.sign_up("Other", "ann@example.com", "different1").unwrap_err();
        assert!(matches!(err, NoterError::DuplicateIdentity));

        assert_eq!(ids.get_by_id(first).unwrap().name, "Ann");
        assert_eq!(ids.authenticate("ann@example.com", "hunter22").unwrap(), first);
    }

    #[test]
    fn wrong_password_and_unknown_email_look_the_same() {
        let ids = manager();
        ids.sign_up("Ann", "ann@example.com", "hunter22").unwrap();

        assert!(matches!(
            ids.authenticate("ann@example.com", "wrong"),
            Err(NoterError::InvalidCredentials)
        ));
        assert!(matches!(
            ids.authenticate("nobody@example.com", "hunter22"),
            Err(NoterError::InvalidCredentials)
        ));
    }

    #[test]
    fn misses_only_verify_against_the_prebuilt_dummy() {
        let mut ids = manager();
        ids.sign_up("Ann", "ann@example.com", "hunter22").unwrap();

        // Any call to `hash` from here on fails, so a miss that hashed would
        // surface as `PasswordHash` instead of `InvalidCredentials`.
        ids.hasher = CredentialHasher::new(HashingParams {
            memory_kib: 1,
            iterations: 1,
            parallelism: 1,
        });

        assert!(matches!(
            ids.authenticate("nobody@example.com", "hunter22"),
            Err(NoterError::InvalidCredentials)
        ));
        assert!(matches!(
            ids.authenticate("ann@example.com", "wrong"),
            Err(NoterError::InvalidCredentials)
        ));
        assert!(matches!(
            ids.change_password(99, "whatever", "new-pass"),
            Err(NoterError::InvalidCredentials)
        ));
    }

    #[test]
    fn construction_fails_on_unusable_hash_params() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let result = IdentityManager::new(
            db,
            Arc::new(SystemClock),
            CredentialHasher::new(HashingParams {
                memory_kib: 1,
                iterations: 1,
                parallelism: 1,
            }),
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(NoterError::PasswordHash(_))));
    }

    #[test]
    fn unknown_profile_is_not_found() {
        let ids = manager();
        assert!(matches!(ids.get_by_id(42), Err(NoterError::NotFound)));
        assert!(!ids.exists(42).unwrap());
        assert_eq!(ids.count().unwrap(), 0);
    }

    #[test]
    fn password_rotation() {
        let ids = manager();
        let id = ids.sign_up("Ann", "ann@example.com", "first-pass").unwrap();

        assert!(matches!(
            ids.change_password(id, "not-it", "second-pass"),
            Err(NoterError::InvalidCredentials)
        ));
        ids.change_password(id, "first-pass", "second-pass").unwrap();

        assert_eq!(ids.authenticate("ann@example.com", "second-pass").unwrap(), id);
        assert!(matches!(
            ids.authenticate("ann@example.com", "first-pass"),
            Err(NoterError::InvalidCredentials)
        ));
    }

    #[test]
    fn rotation_for_unknown_user_is_invalid_credentials() {
        let ids = manager();
        assert!(matches!(
            ids.change_password(99, "whatever", "new-pass"),
            Err(NoterError::InvalidCredentials)
        ));
    }
}
