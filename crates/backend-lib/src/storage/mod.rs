// ============================
// crates/backend-lib/src/storage/mod.rs
// ============================
//! Storage abstractions for the account service.
//!
//! Both backends are external collaborators; the in-memory implementations
//! stand in for them in single-node deployments and tests.
use thiserror::Error;

use crate::error::AppError;

pub mod kv;
pub mod users;

pub use kv::{KvStore, MemoryKvStore};
pub use users::{MemoryUserRepository, NewUser, User, UserRepository};

/// Key-value store failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("ttl must be greater than zero")]
    InvalidTtl,
}

/// User repository failures
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("duplicate email")]
    DuplicateEmail,

    #[error("record not found")]
    RecordNotFound,

    #[error("user repository failure: {0}")]
    Backend(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DuplicateEmail => AppError::DuplicateEmail,
            RepositoryError::RecordNotFound => AppError::RecordNotFound("user not found".to_string()),
            RepositoryError::Backend(detail) => AppError::Internal(detail),
        }
    }
}
