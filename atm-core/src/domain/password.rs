//! Password hashing and password-change rules
//!
//! Passwords are stored as Argon2id PHC strings (`$argon2id$v=19$m=...`),
//! which carry their own salt and cost parameters. Verification reads the
//! parameters back out of the stored string, so changing the configured
//! costs only affects newly hashed passwords.

use std::fmt;

use argon2::password_hash::{self, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Default Argon2id parameters
pub const DEFAULT_TIME_COST: u32 = 3;
pub const DEFAULT_MEMORY_COST: u32 = 65536; // 64 MiB
pub const DEFAULT_PARALLELISM: u32 = 4;

/// Salt length in bytes before base64 encoding
const SALT_LEN: usize = 16;

/// Argon2id cost parameters for new password hashes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Argon2Params {
    pub time_cost: u32,
    /// Memory in KiB
    pub memory_cost: u32,
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            time_cost: DEFAULT_TIME_COST,
            memory_cost: DEFAULT_MEMORY_COST,
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}

impl Argon2Params {
    fn hasher(&self) -> Result<Argon2<'static>> {
        let params = Params::new(self.memory_cost, self.time_cost, self.parallelism, None)
            .map_err(|e| Error::Hashing(format!("invalid argon2 params: {}", e)))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// A salted Argon2id password hash in PHC string format
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hash a raw password with a fresh random salt
    pub fn from_raw_password(raw_password: &str, params: &Argon2Params) -> Result<Self> {
        let salt_bytes: [u8; SALT_LEN] = rand::thread_rng().gen();
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| Error::Hashing(e.to_string()))?;

        let hash = params
            .hasher()?
            .hash_password(raw_password.as_bytes(), &salt)
            .map_err(|e| Error::Hashing(e.to_string()))?;

        Ok(Self(hash.to_string()))
    }

    /// Wrap a hash string read back from the database
    pub fn from_stored(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    /// Check `raw_password` against this hash.
    ///
    /// A malformed stored hash never verifies.
    pub fn verify(&self, raw_password: &str) -> bool {
        let Ok(parsed) = password_hash::PasswordHash::new(&self.0) else {
            return false;
        };
        Argon2::default()
            .verify_password(raw_password.as_bytes(), &parsed)
            .is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(********)")
    }
}

/// Why a password change was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordMismatch {
    /// The supplied current password does not match the stored one
    CurrentIncorrect,
    /// The new password and its confirmation differ
    ConfirmationDiffers,
}

impl fmt::Display for PasswordMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordMismatch::CurrentIncorrect => f.write_str("Incorrect current password"),
            PasswordMismatch::ConfirmationDiffers => f.write_str("New passwords do not match"),
        }
    }
}

/// Validate a new password and its confirmation
pub fn check_new_password(new_password: &str, confirm_password: &str, min_length: usize) -> Result<()> {
    if new_password != confirm_password {
        return Err(Error::PasswordMismatch(PasswordMismatch::ConfirmationDiffers));
    }
    if new_password.chars().count() < min_length {
        return Err(Error::validation(format!(
            "password must be at least {} characters",
            min_length
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_params() -> Argon2Params {
        Argon2Params {
            time_cost: 1,
            memory_cost: 8,
            parallelism: 1,
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = PasswordHash::from_raw_password("1234", &cheap_params()).unwrap();
        assert!(hash.as_str().starts_with("$argon2id$"));
        assert!(hash.verify("1234"));
        assert!(!hash.verify("4321"));
        assert!(!hash.verify(""));
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let a = PasswordHash::from_raw_password("secret", &cheap_params()).unwrap();
        let b = PasswordHash::from_raw_password("secret", &cheap_params()).unwrap();
        assert_ne!(a, b);
        assert!(a.verify("secret"));
        assert!(b.verify("secret"));
    }

    #[test]
    fn test_plaintext_in_database_never_verifies() {
        let stored = PasswordHash::from_stored("1234");
        assert!(!stored.verify("1234"));
    }

    #[test]
    fn test_debug_is_redacted() {
        let hash = PasswordHash::from_raw_password("1234", &cheap_params()).unwrap();
        let debug = format!("{:?}", hash);
        assert!(!debug.contains("argon2"));
    }

    #[test]
    fn test_invalid_params_are_a_hashing_error() {
        let params = Argon2Params {
            time_cost: 0,
            memory_cost: 8,
            parallelism: 1,
        };
        let result = PasswordHash::from_raw_password("1234", &params);
        assert!(matches!(result, Err(Error::Hashing(_))));
    }

    #[test]
    fn test_check_new_password() {
        assert!(check_new_password("abcd", "abcd", 4).is_ok());

        let mismatch = check_new_password("abcd", "abce", 4);
        assert!(matches!(
            mismatch,
            Err(Error::PasswordMismatch(PasswordMismatch::ConfirmationDiffers))
        ));

        let short = check_new_password("abc", "abc", 4);
        assert!(matches!(short, Err(Error::Validation(_))));
    }
}
