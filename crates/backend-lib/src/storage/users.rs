// ============================
// crates/backend-lib/src/storage/users.rs
// ============================
//! User record repository.
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use kalenderium_common::UserId;
use std::sync::atomic::{AtomicU64, Ordering};

use super::RepositoryError;
use crate::auth::PasswordDigest;

/// Stored user credential
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: UserId,
    pub email: String,
    pub password_hash: PasswordDigest,
}

/// User about to be inserted; it cannot exist without a password hash
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: PasswordDigest,
}

/// Trait for user record backends
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user, failing with `DuplicateEmail` if the address is taken
    async fn create_user(&self, user: NewUser) -> Result<UserId, RepositoryError>;

    /// Look a user up by email, failing with `RecordNotFound` if absent
    async fn get_user(&self, email: &str) -> Result<User, RepositoryError>;

    /// Connectivity check
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// In-memory repository; emails are unique regardless of case
#[derive(Debug)]
pub struct MemoryUserRepository {
    users: DashMap<String, User>,
    next_id: AtomicU64,
}

impl Default for MemoryUserRepository {
    fn default() -> Self {
        Self {
            users: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

fn email_key(email: &str) -> String {
    email.to_lowercase()
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create_user(&self, user: NewUser) -> Result<UserId, RepositoryError> {
        match self.users.entry(email_key(&user.email)) {
            Entry::Occupied(_) => Err(RepositoryError::DuplicateEmail),
            Entry::Vacant(slot) => {
                let user_id = self.next_id.fetch_add(1, Ordering::Relaxed);
                slot.insert(User {
                    user_id,
                    email: user.email,
                    password_hash: user.password_hash,
                });
                Ok(user_id)
            },
        }
    }

    async fn get_user(&self, email: &str) -> Result<User, RepositoryError> {
        self.users
            .get(&email_key(email))
            .map(|user| user.clone())
            .ok_or(RepositoryError::RecordNotFound)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
