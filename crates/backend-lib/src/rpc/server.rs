// ============================
// crates/backend-lib/src/rpc/server.rs
// ============================
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use kalenderium_common::{AccountRequest, AccountResponse};
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::Span;

use super::ACCOUNT_RPC_PATH;
use crate::auth::AccountService;
use crate::error::AppError;
use crate::middleware::panic_response;

#[derive(Clone)]
struct RpcState {
    accounts: Arc<dyn AccountService>,
    span: Span,
}

/// Router exposing `accounts` on the account RPC endpoint
pub fn account_router(accounts: Arc<dyn AccountService>, span: Span) -> Router {
    Router::new()
        .route(ACCOUNT_RPC_PATH, post(handle_rpc))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(RpcState { accounts, span })
}

async fn handle_rpc(
    State(state): State<RpcState>,
    payload: Result<Json<AccountRequest>, JsonRejection>,
) -> (StatusCode, Json<AccountResponse>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(parent: &state.span, error = %rejection, "undecodable account rpc");
            let err = AppError::from(rejection).to_rpc_error();
            return (StatusCode::BAD_REQUEST, Json(AccountResponse::Error(err)));
        },
    };

    let response = match dispatch(state.accounts.as_ref(), request).await {
        Ok(response) => response,
        Err(err) => {
            if err.is_internal() {
                tracing::error!(parent: &state.span, error = %err, "account rpc failed");
            } else {
                tracing::debug!(parent: &state.span, code = err.error_code(), "account rpc rejected");
            }
            AccountResponse::Error(err.to_rpc_error())
        },
    };
    (StatusCode::OK, Json(response))
}

/// Run one account request against `accounts`
pub async fn dispatch(
    accounts: &dyn AccountService,
    request: AccountRequest,
) -> Result<AccountResponse, AppError> {
    match request {
        AccountRequest::IsAuth { token } => {
            let token = accounts.is_auth(&token.plaintext).await?;
            Ok(AccountResponse::Authenticated { token })
        },
        AccountRequest::SignUp { user } => {
            let (user_id, token) = accounts.sign_up(user).await?;
            Ok(AccountResponse::SignedUp { user_id, token })
        },
        AccountRequest::Login { user } => {
            let (user_id, token) = accounts.login(user).await?;
            Ok(AccountResponse::LoggedIn { user_id, token })
        },
        AccountRequest::Logout { token } => {
            accounts.logout(&token.plaintext).await?;
            Ok(AccountResponse::LoggedOut)
        },
        AccountRequest::ServiceStatus => {
            accounts.service_status().await?;
            Ok(AccountResponse::Status { healthy: true })
        },
    }
}
