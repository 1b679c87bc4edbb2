use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{self, SaltString, rand_core::OsRng},
};

use crate::error::{NoterError, Result};

/// Argon2id cost parameters. The default is the OWASP baseline
/// (19 MiB, 2 passes, 1 lane), roughly the cost of bcrypt at 12.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingParams {
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl HashingParams {
    /// Minimal cost, only fit for tests.
    pub fn cheap() -> Self {
        Self {
            memory_kib: 1_024,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Salted Argon2id hashing. Hashes are stored as PHC strings, which carry
/// their own parameters, so raising the cost never breaks old hashes.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: HashingParams,
}

impl CredentialHasher {
    pub fn new(params: HashingParams) -> Self {
        Self { params }
    }

    fn argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(
            self.params.memory_kib,
            self.params.iterations,
            self.params.parallelism,
            None,
        )
        .map_err(|e| NoterError::PasswordHash(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    pub fn hash(&self, password: &str) -> Result<Vec<u8>> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| NoterError::PasswordHash(e.to_string()))?
            .to_string();
        Ok(hash.into_bytes())
    }

    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unusable.
    pub fn verify(&self, password: &str, stored: &[u8]) -> Result<bool> {
        let phc = std::str::from_utf8(stored)
            .map_err(|e| NoterError::PasswordHash(format!("stored hash is not utf-8: {e}")))?;
        let parsed = PasswordHash::new(phc).map_err(|e| NoterError::PasswordHash(e.to_string()))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(NoterError::PasswordHash(e.to_string())),
        }
    }
}
