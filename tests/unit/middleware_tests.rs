// ==============================
// tests/unit/middleware_tests.rs
// ==============================
//! Unit tests for the gateway middleware stack
use axum::http::{header, Method, StatusCode};
use backend_lib::auth::AccountService;
use backend_lib::middleware::RateLimiter;
use kalenderium_common::Credentials;
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tower::ServiceExt;
use tracing::Span;

use crate::test_utils::{account_service, body_json, gateway, request, SlowAccounts};

#[tokio::test]
async fn test_anonymous_caller_is_rejected_on_protected_route() {
    let app = gateway(account_service(), None);

    let response = app
        .oneshot(request(Method::GET, "/v1/calendar", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "AUTH_003");
}

#[tokio::test]
async fn test_malformed_authorization_header() {
    let app = gateway(account_service(), None);

    for value in ["Basic abc", "Bearer", "Bearer short", "Bearer  ABCDEFGHIJKLMNOPQRSTUVWXYZ"] {
        let mut req = request(Method::GET, "/v1/calendar", None, None);
        req.headers_mut().insert(header::AUTHORIZATION, value.parse().unwrap());

        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{value}");
        assert_eq!(response.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
        assert_eq!(response.headers().get(header::VARY).unwrap(), "Authorization");
    }
}

#[tokio::test]
async fn test_unknown_token_is_rejected() {
    let app = gateway(account_service(), None);

    let response = app
        .oneshot(request(
            Method::GET,
            "/v1/calendar",
            None,
            Some("ABCDEFGHIJKLMNOPQRSTUVWXYZ"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
}

#[tokio::test]
async fn test_valid_bearer_token_is_admitted() {
    let accounts = account_service();
    let (_, token) = accounts
        .sign_up(Credentials::new("a@b.com", "password1"))
        .await
        .unwrap();
    let app = gateway(accounts, None);

    let response = app
        .oneshot(request(Method::GET, "/v1/calendar", None, Some(&token.plaintext)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "events": [] }));
}

#[tokio::test(start_paused = true)]
async fn test_slow_account_service_fails_closed() {
    let app = gateway(
        Arc::new(SlowAccounts {
            delay: Duration::from_secs(2),
        }),
        None,
    );

    let response = app
        .oneshot(request(
            Method::GET,
            "/v1/calendar",
            None,
            Some("ABCDEFGHIJKLMNOPQRSTUVWXYZ"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
}

#[tokio::test(start_paused = true)]
async fn test_fifth_burst_request_is_rate_limited() {
    let limiter = Arc::new(
        RateLimiter::new(4, 2.0, Duration::from_secs(180), Span::none()).with_forwarded_headers(true),
    );
    let app = gateway(account_service(), Some(limiter));

    for _ in 0..4 {
        let mut req = request(Method::GET, "/v1/healthcheck", None, None);
        req.headers_mut().insert("x-real-ip", "10.0.0.1".parse().unwrap());
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let mut req = request(Method::GET, "/v1/healthcheck", None, None);
    req.headers_mut().insert("x-real-ip", "10.0.0.1".parse().unwrap());
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().get(header::RETRY_AFTER).is_none());

    // Another client is unaffected
    let mut req = request(Method::GET, "/v1/healthcheck", None, None);
    req.headers_mut().insert("x-real-ip", "10.0.0.2".parse().unwrap());
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test(start_paused = true)]
async fn test_rotating_forwarded_header_shares_one_bucket() {
    let limiter = Arc::new(RateLimiter::new(4, 2.0, Duration::from_secs(180), Span::none()));
    let app = gateway(account_service(), Some(Arc::clone(&limiter)));

    let mut statuses = Vec::new();
    for i in 0..6 {
        let mut req = request(Method::GET, "/v1/healthcheck", None, None);
        req.headers_mut()
            .insert("x-forwarded-for", format!("1.2.3.{i}").parse().unwrap());
        statuses.push(app.clone().oneshot(req).await.unwrap().status());
    }

    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::OK).count(), 4);
    assert_eq!(statuses[4], StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limiter.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_runs_before_authentication() {
    let limiter = Arc::new(RateLimiter::new(1, 0.1, Duration::from_secs(180), Span::none()));
    let app = gateway(
        Arc::new(SlowAccounts {
            delay: Duration::from_secs(2),
        }),
        Some(limiter),
    );

    let token = Some("ABCDEFGHIJKLMNOPQRSTUVWXYZ");
    let response = app
        .clone()
        .oneshot(request(Method::GET, "/v1/calendar", None, token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(request(Method::GET, "/v1/calendar", None, token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}
