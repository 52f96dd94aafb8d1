//! Argon2id password hashing.

use crate::error::{Result, StceError};
use argon2::password_hash::{self, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
#[cfg(test)]
use std::sync::Arc;
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};

/// Work factor for new hashes. Verification reads the parameters from the
/// stored PHC string, so hashes made at either cost verify with any hasher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PasswordCost {
    /// The argon2 crate's recommended parameters.
    #[default]
    Standard,
    /// Smallest legal parameters; for tests only.
    Minimal,
}

/// Creates and checks stored password hashes.
#[derive(Clone)]
pub struct Hasher {
    argon2: Argon2<'static>,
    #[cfg(test)]
    verifications: Arc<AtomicUsize>,
}

impl Default for Hasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
            #[cfg(test)]
            verifications: Arc::default(),
        }
    }
}

impl Hasher {
    pub fn new(cost: PasswordCost) -> Result<Self> {
        let params = match cost {
            PasswordCost::Standard => argon2::Params::default(),
            PasswordCost::Minimal => argon2::Params::new(8, 1, 1, None)
                .map_err(|e| StceError::Password(e.to_string()))?,
        };
        Ok(Self {
            argon2: Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::default(), params),
            #[cfg(test)]
            verifications: Arc::default(),
        })
    }

    /// Hash `password` with a fresh random salt, returning a PHC string.
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut rand::thread_rng());
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| StceError::Password(e.to_string()))
    }

    /// `Ok(false)` on a mismatch; `Err` only when `stored` is unusable.
    pub fn verify(&self, password: &str, stored: &str) -> Result<bool> {
        #[cfg(test)]
        self.verifications.fetch_add(1, Ordering::Relaxed);
        let parsed = PasswordHash::new(stored).map_err(|e| StceError::Password(e.to_string()))?;
        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(StceError::Password(e.to_string())),
        }
    }

    /// Calls to [`Hasher::verify`] across this hasher and its clones.
    #[cfg(test)]
    pub(crate) fn verifications(&self) -> usize {
        self.verifications.load(Ordering::Relaxed)
    }
}
