// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod password;
pub mod session;
pub mod token;
mod service;
mod service_impl;

use crate::error::AppError;

pub use password::{CredentialHasher, PasswordDigest, PasswordError, DEFAULT_PASSWORD_COST};
pub use service::AccountService;
pub use service_impl::DefaultAccountService;
pub use session::{SessionError, SessionStore};
pub use token::{generate_token, hash_plaintext, validate_token_shape, TokenError, SESSION_TTL};

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Internal(err.to_string())
    }
}
