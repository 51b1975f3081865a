// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Input validation.
//!
//! Checks never short-circuit: a [`Validator`] collects every failed rule
//! into a field-keyed [`FieldErrors`] map so callers see all violations at
//! once.

use kalenderium_common::FieldErrors;
use regex::Regex;
use std::sync::LazyLock;

// Common validation constants
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 72;
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .unwrap()
});

/// Accumulates rule violations keyed by field name
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` under `key` unless `ok` holds
    pub fn check(&mut self, ok: bool, key: &str, message: &str) {
        if !ok {
            self.errors.add(key, message);
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Finish validation, yielding every collected violation on failure
    pub fn finish(self) -> Result<(), FieldErrors> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Whether `email` has the shape of an address
pub fn is_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

pub fn validate_email(v: &mut Validator, email: &str) {
    v.check(!email.is_empty(), "email", "must be provided");
    v.check(
        email.len() <= MAX_EMAIL_LENGTH,
        "email",
        "must not be more than 254 bytes long",
    );
    v.check(is_email(email), "email", "must be a valid email address");
}

/// Length limits are in bytes; the upper bound matches what the adaptive
/// hash accepts for a single block.
pub fn validate_password(v: &mut Validator, password: &str) {
    v.check(!password.is_empty(), "password", "must be provided");
    v.check(
        password.len() >= MIN_PASSWORD_LENGTH,
        "password",
        "must be at least 8 bytes long",
    );
    v.check(
        password.len() <= MAX_PASSWORD_LENGTH,
        "password",
        "must not be more than 72 bytes long",
    );
}

/// Validate an email/password pair submitted on signup or login
pub fn validate_credentials(email: &str, password: &str) -> Result<(), FieldErrors> {
    let mut v = Validator::new();
    validate_email(&mut v, email);
    validate_password(&mut v, password);
    v.finish()
}
