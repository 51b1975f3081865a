// ============================
// crates/backend-lib/src/auth/password.rs
// ============================
//! Password hashing and verification.
use rand::{rngs::OsRng, TryRngCore};
use scrypt::{
    password_hash::{Error as HashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Params, Scrypt,
};
use std::fmt;
use thiserror::Error;

/// Default scrypt cost (`log_n`), comparable to bcrypt cost 12
pub const DEFAULT_PASSWORD_COST: u8 = 15;

const SALT_BYTES: usize = 16;

/// Errors from hashing or verifying, never from password shape
#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("random source unavailable: {0}")]
    RandomSource(String),

    #[error("invalid hash parameters: {0}")]
    InvalidParams(String),

    #[error("malformed password hash")]
    MalformedHash,

    #[error("password hashing failed: {0}")]
    Hash(HashError),
}

/// PHC-formatted password hash (algorithm, cost, salt and digest).
///
/// A user record cannot be built without one, so a plaintext password can
/// never reach the persistence layer in its place.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Wrap a stored PHC string
    pub fn from_phc(phc: impl Into<String>) -> Result<Self, PasswordError> {
        let phc = phc.into();
        if phc.is_empty() {
            return Err(PasswordError::MalformedHash);
        }
        Ok(Self(phc))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordDigest(..)")
    }
}

/// One-way adaptive password hasher with a fixed cost
#[derive(Clone, Debug)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    /// Hasher with scrypt cost `log_n`
    pub fn new(cost: u8) -> Result<Self, PasswordError> {
        let params = Params::new(
            cost,
            Params::RECOMMENDED_R,
            Params::RECOMMENDED_P,
            Params::RECOMMENDED_LEN,
        )
        .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;
        Ok(Self { params })
    }

    /// Cost factor embedded in every hash this instance produces
    pub fn cost(&self) -> u8 {
        self.params.log_n()
    }

    /// Hash a password with a fresh salt from the OS CSPRNG
    pub fn hash(&self, plain: &str) -> Result<PasswordDigest, PasswordError> {
        let mut salt_bytes = [0u8; SALT_BYTES];
        OsRng
            .try_fill_bytes(&mut salt_bytes)
            .map_err(|e| PasswordError::RandomSource(e.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(PasswordError::Hash)?;

        let hash = Scrypt
            .hash_password_customized(plain.as_bytes(), None, None, self.params, &salt)
            .map_err(PasswordError::Hash)?
            .to_string();
        Ok(PasswordDigest(hash))
    }

    /// Check `plain` against a stored hash.
    ///
    /// `Ok(false)` is a clean mismatch; `Err` means the hash could not be
    /// checked at all.
    pub fn verify(&self, hash: &str, plain: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::MalformedHash)?;
        match Scrypt.verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(HashError::Password) => Ok(false),
            Err(e) => Err(PasswordError::Hash(e)),
        }
    }
}
