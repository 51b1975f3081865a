use async_trait::async_trait;
use kalenderium_common::{Credentials, Token, UserId};

use crate::error::AppError;

/// Account operations, served locally by the account process and over RPC
/// from the gateway.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Resolve a presented plaintext token to its live session
    async fn is_auth(&self, plaintext: &str) -> Result<Token, AppError>;

    /// Register a new user and open a first session
    async fn sign_up(&self, credentials: Credentials) -> Result<(UserId, Token), AppError>;

    /// Open a new, independent session for an existing user
    async fn login(&self, credentials: Credentials) -> Result<(UserId, Token), AppError>;

    /// End the session for a plaintext token; unknown tokens succeed
    async fn logout(&self, plaintext: &str) -> Result<(), AppError>;

    /// Reachability of every backing store
    async fn service_status(&self) -> Result<(), AppError>;
}
