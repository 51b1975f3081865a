// ============================
// crates/backend-lib/src/middleware/auth.rs
// ============================
//! Bearer-token authentication.
//!
//! Every request leaves this layer with an [`Identity`] in its extensions,
//! either a resolved user or the anonymous sentinel. Handlers that need a
//! user take the [`CurrentUser`] extractor.
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, Extensions, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use kalenderium_common::UserId;
use std::{sync::Arc, time::Duration};
use tracing::Span;

use crate::auth::{validate_token_shape, AccountService};
use crate::error::AppError;

/// Default bound on the per-request token check
pub const DEFAULT_IS_AUTH_TIMEOUT: Duration = Duration::from_secs(1);

/// Who is making the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    User { user_id: UserId },
}

impl Identity {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Identity::Anonymous => None,
            Identity::User { user_id } => Some(*user_id),
        }
    }

    /// Identity attached by [`authenticate`], if the layer ran
    pub fn from_extensions(extensions: &Extensions) -> Option<&Identity> {
        extensions.get::<Identity>()
    }
}

/// State for [`authenticate`]
#[derive(Clone)]
pub struct AuthLayerState {
    pub accounts: Arc<dyn AccountService>,
    pub is_auth_timeout: Duration,
    pub span: Span,
}

/// Plaintext from an `Authorization: Bearer <token>` header.
///
/// `Ok(None)` when the header is absent.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::InvalidAuthenticationToken)?;

    let parts: Vec<&str> = value.split(' ').collect();
    match parts.as_slice() {
        ["Bearer", token] => Ok(Some(*token)),
        _ => Err(AppError::InvalidAuthenticationToken),
    }
}

async fn resolve(state: &AuthLayerState, headers: &HeaderMap) -> Result<Identity, AppError> {
    let Some(plaintext) = bearer_token(headers)? else {
        return Ok(Identity::Anonymous);
    };

    if validate_token_shape(plaintext).is_err() {
        return Err(AppError::InvalidAuthenticationToken);
    }

    match tokio::time::timeout(state.is_auth_timeout, state.accounts.is_auth(plaintext)).await {
        Ok(Ok(token)) => Ok(Identity::User {
            user_id: token.user_id,
        }),
        Ok(Err(err)) => {
            if err.is_internal() {
                tracing::error!(parent: &state.span, error = %err, "token check failed");
            }
            Err(AppError::InvalidAuthenticationToken)
        },
        Err(_) => {
            tracing::warn!(parent: &state.span, "token check timed out");
            Err(AppError::InvalidAuthenticationToken)
        },
    }
}

/// Authentication middleware
pub async fn authenticate(
    State(state): State<AuthLayerState>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = resolve(&state, request.headers()).await;

    let mut response = match identity {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        },
        Err(err) => axum::response::IntoResponse::into_response(err),
    };

    response
        .headers_mut()
        .append(header::VARY, HeaderValue::from_static("Authorization"));
    response
}

/// Extractor for handlers that require an authenticated user
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub UserId);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match Identity::from_extensions(&parts.extensions) {
            Some(Identity::User { user_id }) => Ok(CurrentUser(*user_id)),
            Some(Identity::Anonymous) => Err(AppError::AuthenticationRequired),
            None => Err(AppError::Internal(
                "identity missing from request context".to_string(),
            )),
        }
    }
}
