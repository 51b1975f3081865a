// ============================
// crates/backend-lib/src/router.rs
// ============================
//! HTTP gateway routes.
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use kalenderium_common::{Credentials, Token, UserId};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::Span;

use crate::auth::AccountService;
use crate::calendar::{CalendarService, Event, NewEvent};
use crate::error::AppError;
use crate::extract::AppJson;
use crate::middleware::{
    authenticate, panic_response, rate_limit, secure_headers, AuthLayerState, CurrentUser,
    RateLimiter,
};

/// Shared state of the gateway
pub struct GatewayState {
    pub accounts: Arc<dyn AccountService>,
    pub calendar: Arc<dyn CalendarService>,
    /// `None` disables admission control
    pub rate_limiter: Option<Arc<RateLimiter>>,
    pub is_auth_timeout: Duration,
    pub allowed_origin: Option<String>,
    pub span: Span,
}

/// Body of signup and login requests
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub user: Credentials,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlaintextToken {
    #[serde(default)]
    pub plaintext: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub token: PlaintextToken,
}

#[derive(Debug, Deserialize)]
pub struct AddEventRequest {
    pub event: NewEvent,
}

/// Token as handed to HTTP clients; the lookup hash stays server-side
#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub plaintext: String,
    pub expiry: Option<DateTime<Utc>>,
}

impl From<Token> for IssuedToken {
    fn from(token: Token) -> Self {
        Self {
            plaintext: token.plaintext,
            expiry: token.expiry,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user_id: UserId,
    pub token: IssuedToken,
}

#[derive(Serialize, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<Event>,
}

/// Build the gateway router.
///
/// Layers run outermost first: tracing, CORS, secure headers, panic recovery,
/// rate limiting, then authentication.
pub fn create_router(state: Arc<GatewayState>) -> Router {
    let auth_state = AuthLayerState {
        accounts: Arc::clone(&state.accounts),
        is_auth_timeout: state.is_auth_timeout,
        span: state.span.clone(),
    };

    let mut router = Router::new()
        .route("/v1/healthcheck", get(healthcheck))
        .route("/v1/signup", post(sign_up))
        .route("/v1/login", post(login))
        .route("/v1/logout", post(logout))
        .route("/v1/calendar", get(list_events).post(add_event))
        .route("/v1/calendar/{id}", delete(delete_event))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(middleware::from_fn_with_state(auth_state, authenticate));

    if let Some(limiter) = &state.rate_limiter {
        router = router.layer(middleware::from_fn_with_state(Arc::clone(limiter), rate_limit));
    }

    router = router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(secure_headers));

    if let Some(cors) = cors_layer(state.allowed_origin.as_deref(), &state.span) {
        router = router.layer(cors);
    }

    router
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origin: Option<&str>, span: &Span) -> Option<CorsLayer> {
    let origin = origin?;
    match HeaderValue::from_str(origin) {
        Ok(origin) => Some(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        ),
        Err(e) => {
            tracing::warn!(parent: span, origin, error = %e, "ignoring invalid CORS origin");
            None
        },
    }
}

async fn healthcheck(State(state): State<Arc<GatewayState>>) -> Result<impl IntoResponse, AppError> {
    state.accounts.service_status().await?;
    Ok(Json(json!({ "status": "available" })))
}

async fn sign_up(
    State(state): State<Arc<GatewayState>>,
    AppJson(body): AppJson<CredentialsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (user_id, token) = state.accounts.sign_up(body.user).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user_id,
            token: token.into(),
        }),
    ))
}

async fn login(
    State(state): State<Arc<GatewayState>>,
    AppJson(body): AppJson<CredentialsRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let (user_id, token) = state.accounts.login(body.user).await?;
    Ok(Json(AuthResponse {
        user_id,
        token: token.into(),
    }))
}

async fn logout(
    State(state): State<Arc<GatewayState>>,
    AppJson(body): AppJson<LogoutRequest>,
) -> Result<StatusCode, AppError> {
    state.accounts.logout(&body.token.plaintext).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_events(
    State(state): State<Arc<GatewayState>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<EventsResponse>, AppError> {
    let events = state.calendar.list_events(user_id).await?;
    Ok(Json(EventsResponse { events }))
}

async fn add_event(
    State(state): State<Arc<GatewayState>>,
    CurrentUser(user_id): CurrentUser,
    AppJson(body): AppJson<AddEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let event_id = state.calendar.add_event(user_id, body.event).await?;
    Ok((StatusCode::CREATED, Json(json!({ "eventId": event_id }))))
}

async fn delete_event(
    State(state): State<Arc<GatewayState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.calendar.delete_event(&id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn not_found() -> AppError {
    AppError::RecordNotFound("route".to_string())
}

async fn method_not_allowed(method: Method) -> AppError {
    AppError::MethodNotAllowed(method.to_string())
}
