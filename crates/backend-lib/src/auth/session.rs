// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Session records kept in the shared TTL store.
//!
//! A session lives under the SHA-256 of its token plaintext and carries a
//! store-native TTL equal to the token's remaining lifetime. The store is the
//! only authority on liveness: a missing key and an expired key are the same
//! outcome.
use chrono::Utc;
use kalenderium_common::Token;
use std::{future::Future, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::Span;

use super::token::hash_plaintext;
use crate::error::AppError;
use crate::storage::{KvStore, StoreError};

/// Default bound on a single store round trip
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("malformed session record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("session store timed out")]
    Timeout,

    #[error("token has no expiry")]
    MissingExpiry,
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound => AppError::Authentication("session is not available".to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Session persistence over a [`KvStore`]
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KvStore>,
    op_timeout: Duration,
    span: Span,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KvStore>, op_timeout: Duration, span: Span) -> Self {
        Self {
            store,
            op_timeout,
            span,
        }
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, SessionError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.op_timeout, op).await {
            Ok(result) => result.map_err(SessionError::from),
            Err(_) => {
                tracing::warn!(parent: &self.span, timeout_ms = self.op_timeout.as_millis() as u64, "session store call timed out");
                Err(SessionError::Timeout)
            },
        }
    }

    /// Store `token` under its hash until it expires.
    ///
    /// Overwrites any earlier record for the same hash. A token that has
    /// already expired is not written and any stale record is removed.
    pub async fn set(&self, token: &Token) -> Result<(), SessionError> {
        let expiry = token.expiry.ok_or(SessionError::MissingExpiry)?;
        let remaining = (expiry - Utc::now()).to_std().unwrap_or(Duration::ZERO);

        if remaining.is_zero() {
            tracing::debug!(parent: &self.span, user_id = token.user_id, "token already expired, not storing");
            self.bounded(self.store.del(&token.hash)).await?;
            return Ok(());
        }

        let mut record = token.clone();
        record.plaintext.clear();
        let value = serde_json::to_string(&record)?;

        self.bounded(self.store.set_ex(&token.hash, value, remaining)).await
    }

    /// Look up the session for a presented plaintext token
    pub async fn get(&self, plaintext: &str) -> Result<Token, SessionError> {
        let hash = hash_plaintext(plaintext);
        let value = self
            .bounded(self.store.get(&hash))
            .await?
            .ok_or(SessionError::NotFound)?;

        let mut token: Token = serde_json::from_str(&value)?;
        token.plaintext = plaintext.to_string();
        Ok(token)
    }

    /// Remove the session stored under `hash`; absent keys are not an error
    pub async fn delete(&self, hash: &str) -> Result<(), SessionError> {
        let removed = self.bounded(self.store.del(hash)).await?;
        tracing::debug!(parent: &self.span, removed, "session delete");
        Ok(())
    }

    /// Connectivity check against the backing store
    pub async fn ping(&self) -> Result<(), SessionError> {
        self.bounded(self.store.ping()).await
    }
}
