// ============================
// crates/backend-lib/src/auth/token.rs
// ============================
/** Opaque bearer token issuance
Tokens are 16 bytes from the OS CSPRNG, rendered as unpadded base-32.
Only the SHA-256 of the plaintext is ever used as a storage key. */
use chrono::{TimeDelta, Utc};
use data_encoding::BASE32_NOPAD;
use kalenderium_common::{FieldErrors, Scope, Token, UserId};
use rand::{rngs::OsRng, TryRngCore};
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;

use crate::validation::Validator;

/// Random bytes per token (128 bits of entropy)
pub const TOKEN_BYTES: usize = 16;

/// Length of the base-32 plaintext for [`TOKEN_BYTES`] of input
pub const TOKEN_PLAINTEXT_LEN: usize = 26;

/// Lifetime of a session token
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("random source unavailable: {0}")]
    RandomSource(String),

    #[error("token lifetime out of range")]
    InvalidTtl,
}

/** Generate a new token for `user_id`
# Errors
`TokenError::RandomSource` if the OS random source fails; there is no
fallback to a weaker generator. */
pub fn generate_token(user_id: UserId, ttl: Duration, scope: Scope) -> Result<Token, TokenError> {
    generate_token_with(&mut OsRng, user_id, ttl, scope)
}

/// [`generate_token`] over an explicit fallible random source
pub fn generate_token_with<R: TryRngCore + ?Sized>(
    rng: &mut R,
    user_id: UserId,
    ttl: Duration,
    scope: Scope,
) -> Result<Token, TokenError> {
    let ttl = TimeDelta::from_std(ttl).map_err(|_| TokenError::InvalidTtl)?;
    let expiry = Utc::now()
        .checked_add_signed(ttl)
        .ok_or(TokenError::InvalidTtl)?;

    let mut buffer = [0u8; TOKEN_BYTES];
    rng.try_fill_bytes(&mut buffer)
        .map_err(|e| TokenError::RandomSource(e.to_string()))?;

    let plaintext = BASE32_NOPAD.encode(&buffer);
    let hash = hash_plaintext(&plaintext);

    Ok(Token {
        plaintext,
        hash,
        user_id,
        expiry: Some(expiry),
        scope,
    })
}

/// Lookup key for a plaintext token: hex-encoded SHA-256
pub fn hash_plaintext(plaintext: &str) -> String {
    hex::encode(Sha256::digest(plaintext.as_bytes()))
}

/// Token plaintext rules, recorded under the `token` key
pub fn validate_token_plaintext(v: &mut Validator, plaintext: &str) {
    v.check(!plaintext.is_empty(), "token", "must be provided");
    v.check(
        plaintext.len() == TOKEN_PLAINTEXT_LEN,
        "token",
        "must be exactly 26 characters long",
    );
}

/// Shape check on a presented plaintext; reports every violation
pub fn validate_token_shape(plaintext: &str) -> Result<(), FieldErrors> {
    let mut v = Validator::new();
    validate_token_plaintext(&mut v, plaintext);
    v.finish()
}
