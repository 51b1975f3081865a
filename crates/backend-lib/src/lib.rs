// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core backend-lib functionality for the Kalenderium account service and
//! HTTP gateway.

pub mod auth;
pub mod calendar;
pub mod config;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod rpc;
pub mod storage;
pub mod validation;

use std::sync::Arc;

use crate::auth::{CredentialHasher, DefaultAccountService, SessionStore};
use crate::calendar::CalendarService;
use crate::config::Settings;
use crate::middleware::RateLimiter;
use crate::router::GatewayState;
use crate::storage::{KvStore, UserRepository};

/// Wire an account service from settings and its two backing stores
pub fn account_service(
    settings: &Settings,
    store: Arc<dyn KvStore>,
    users: Arc<dyn UserRepository>,
) -> anyhow::Result<DefaultAccountService> {
    let account = &settings.account;
    let sessions = SessionStore::new(
        store,
        account.query_timeout(),
        tracing::info_span!("session_store"),
    );
    let hasher = CredentialHasher::new(account.password_cost)?;

    Ok(DefaultAccountService::new(
        users,
        sessions,
        hasher,
        account.session_ttl(),
        account.query_timeout(),
        tracing::info_span!("account_service"),
    ))
}

/// Gateway state from settings; the rate limiter is absent when disabled
pub fn gateway_state(
    settings: &Settings,
    accounts: Arc<dyn auth::AccountService>,
    calendar: Arc<dyn CalendarService>,
) -> GatewayState {
    let limits = &settings.rate_limit;
    let rate_limiter = limits.enabled.then(|| {
        Arc::new(RateLimiter::new(
            limits.capacity,
            limits.refill_per_sec,
            limits.idle_ttl(),
            tracing::info_span!("rate_limiter"),
        )
        .with_forwarded_headers(limits.trust_forwarded_headers))
    });

    GatewayState {
        accounts,
        calendar,
        rate_limiter,
        is_auth_timeout: settings.gateway.is_auth_timeout(),
        allowed_origin: settings.gateway.allowed_origin.clone(),
        span: tracing::info_span!("gateway"),
    }
}
