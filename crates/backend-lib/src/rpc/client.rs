// ============================
// crates/backend-lib/src/rpc/client.rs
// ============================
use async_trait::async_trait;
use kalenderium_common::{AccountRequest, AccountResponse, Credentials, Token, UserId};
use std::time::Duration;
use tracing::Span;

use super::ACCOUNT_RPC_PATH;
use crate::auth::AccountService;
use crate::error::AppError;

/// [`AccountService`] reached over HTTP
#[derive(Clone)]
pub struct RpcAccountClient {
    client: reqwest::Client,
    endpoint: String,
    span: Span,
}

impl RpcAccountClient {
    /// Client for the account service at `base_url`; no request is made
    pub fn new(base_url: &str, rpc_timeout: Duration, span: Span) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(rpc_timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("building rpc client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), ACCOUNT_RPC_PATH),
            span,
        })
    }

    /// Build a client and confirm the account service answers within
    /// `connect_timeout`
    pub async fn connect(
        base_url: &str,
        rpc_timeout: Duration,
        connect_timeout: Duration,
        span: Span,
    ) -> Result<Self, AppError> {
        let client = Self::new(base_url, rpc_timeout, span)?;
        tokio::time::timeout(connect_timeout, client.service_status())
            .await
            .map_err(|_| AppError::Internal("account service did not answer in time".to_string()))??;
        tracing::info!(parent: &client.span, endpoint = %client.endpoint, "connected to account service");
        Ok(client)
    }

    async fn call(&self, request: AccountRequest) -> Result<AccountResponse, AppError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("account rpc transport: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "account rpc returned status {}",
                response.status()
            )));
        }

        match response
            .json::<AccountResponse>()
            .await
            .map_err(|e| AppError::Internal(format!("account rpc decode: {e}")))?
        {
            AccountResponse::Error(err) => Err(err.into()),
            other => Ok(other),
        }
    }
}

fn unexpected(response: &AccountResponse) -> AppError {
    AppError::Internal(format!("unexpected account response: {response:?}"))
}

#[async_trait]
impl AccountService for RpcAccountClient {
    async fn is_auth(&self, plaintext: &str) -> Result<Token, AppError> {
        match self
            .call(AccountRequest::IsAuth {
                token: Token::bearer(plaintext),
            })
            .await?
        {
            AccountResponse::Authenticated { token } => Ok(token),
            other => Err(unexpected(&other)),
        }
    }

    async fn sign_up(&self, credentials: Credentials) -> Result<(UserId, Token), AppError> {
        match self.call(AccountRequest::SignUp { user: credentials }).await? {
            AccountResponse::SignedUp { user_id, token } => Ok((user_id, token)),
            other => Err(unexpected(&other)),
        }
    }

    async fn login(&self, credentials: Credentials) -> Result<(UserId, Token), AppError> {
        match self.call(AccountRequest::Login { user: credentials }).await? {
            AccountResponse::LoggedIn { user_id, token } => Ok((user_id, token)),
            other => Err(unexpected(&other)),
        }
    }

    async fn logout(&self, plaintext: &str) -> Result<(), AppError> {
        match self
            .call(AccountRequest::Logout {
                token: Token::bearer(plaintext),
            })
            .await?
        {
            AccountResponse::LoggedOut => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    async fn service_status(&self) -> Result<(), AppError> {
        match self.call(AccountRequest::ServiceStatus).await? {
            AccountResponse::Status { healthy: true } => Ok(()),
            AccountResponse::Status { healthy: false } => {
                Err(AppError::Internal("account service reports unhealthy".to_string()))
            },
            other => Err(unexpected(&other)),
        }
    }
}
