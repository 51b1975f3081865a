use async_trait::async_trait;
use kalenderium_common::{Credentials, Scope, Token, UserId};
use metrics::counter;
use std::{future::Future, sync::Arc, time::Duration};
use tracing::Span;
use zeroize::Zeroizing;

use super::{
    password::CredentialHasher,
    session::SessionStore,
    token::{generate_token, hash_plaintext, validate_token_shape},
    AccountService,
};
use crate::error::AppError;
use crate::metrics::{AUTH_REJECTED, SESSION_CREATED, SESSION_DELETED, USER_CREATED};
use crate::storage::{NewUser, RepositoryError, UserRepository};
use crate::validation::validate_credentials;

/// Account service backed by a user repository and a session store
pub struct DefaultAccountService {
    users: Arc<dyn UserRepository>,
    sessions: SessionStore,
    hasher: CredentialHasher,
    session_ttl: Duration,
    query_timeout: Duration,
    span: Span,
}

impl DefaultAccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: SessionStore,
        hasher: CredentialHasher,
        session_ttl: Duration,
        query_timeout: Duration,
        span: Span,
    ) -> Self {
        Self {
            users,
            sessions,
            hasher,
            session_ttl,
            query_timeout,
            span,
        }
    }

    async fn query<T, F>(&self, op: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, RepositoryError>>,
    {
        tokio::time::timeout(self.query_timeout, op)
            .await
            .map_err(|_| AppError::Internal("user repository timed out".to_string()))?
            .map_err(AppError::from)
    }

    async fn issue_session(&self, user_id: UserId) -> Result<Token, AppError> {
        let token = generate_token(user_id, self.session_ttl, Scope::Authentication)?;
        self.sessions.set(&token).await?;
        counter!(SESSION_CREATED).increment(1);
        tracing::debug!(parent: &self.span, user_id, "session issued");
        Ok(token)
    }

    fn reject(&self, reason: &str) -> AppError {
        counter!(AUTH_REJECTED).increment(1);
        AppError::Authentication(reason.to_string())
    }
}

#[async_trait]
impl AccountService for DefaultAccountService {
    async fn is_auth(&self, plaintext: &str) -> Result<Token, AppError> {
        if validate_token_shape(plaintext).is_err() {
            return Err(self.reject("invalid authentication token"));
        }

        match self.sessions.get(plaintext).await {
            Ok(token) => Ok(token),
            Err(super::SessionError::NotFound) => Err(self.reject("session is not available")),
            Err(e) => {
                tracing::error!(parent: &self.span, error = %e, "session lookup failed");
                Err(e.into())
            },
        }
    }

    async fn sign_up(&self, credentials: Credentials) -> Result<(UserId, Token), AppError> {
        let Credentials { email, password } = credentials;
        let password = Zeroizing::new(password);
        validate_credentials(&email, &password)?;

        let hasher = self.hasher.clone();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))??;

        let user_id = self
            .query(self.users.create_user(NewUser {
                email,
                password_hash,
            }))
            .await?;
        counter!(USER_CREATED).increment(1);
        tracing::info!(parent: &self.span, user_id, "user signed up");

        let token = self.issue_session(user_id).await?;
        Ok((user_id, token))
    }

    async fn login(&self, credentials: Credentials) -> Result<(UserId, Token), AppError> {
        let Credentials { email, password } = credentials;
        let password = Zeroizing::new(password);
        validate_credentials(&email, &password)?;

        let user = self.query(self.users.get_user(&email)).await?;

        let hasher = self.hasher.clone();
        let stored = user.password_hash.clone();
        let matches =
            tokio::task::spawn_blocking(move || hasher.verify(stored.as_str(), &password))
                .await
                .map_err(|e| AppError::Internal(format!("verification task failed: {e}")))??;

        if !matches {
            tracing::info!(parent: &self.span, user_id = user.user_id, "password mismatch");
            return Err(self.reject("invalid email or password"));
        }

        let token = self.issue_session(user.user_id).await?;
        Ok((user.user_id, token))
    }

    async fn logout(&self, plaintext: &str) -> Result<(), AppError> {
        validate_token_shape(plaintext)?;
        self.sessions.delete(&hash_plaintext(plaintext)).await?;
        counter!(SESSION_DELETED).increment(1);
        Ok(())
    }

    async fn service_status(&self) -> Result<(), AppError> {
        self.query(self.users.ping()).await?;
        self.sessions.ping().await?;
        Ok(())
    }
}
