// ==============================
// tests/integration/rpc_tests.rs
// ==============================
//! Gateway to account service over a real socket
use axum::http::{Method, StatusCode};
use backend_lib::auth::AccountService;
use backend_lib::error::AppError;
use backend_lib::rpc::{account_router, RpcAccountClient};
use kalenderium_common::Credentials;
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tracing::Span;

use crate::test_utils::{account_service, body_json, gateway, request};

/// Serve a fresh account service on an ephemeral port; returns its base URL
async fn spawn_account_service(shutdown: CancellationToken) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = account_router(account_service(), Span::none());

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
            .unwrap();
    });
    format!("http://{addr}")
}

async fn connect(url: &str) -> RpcAccountClient {
    RpcAccountClient::connect(url, Duration::from_secs(5), Duration::from_secs(5), Span::none())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_rpc_round_trip() {
    let shutdown = CancellationToken::new();
    let url = spawn_account_service(shutdown.clone()).await;
    let client = connect(&url).await;

    let (user_id, a) = client
        .sign_up(Credentials::new("a@b.com", "password1"))
        .await
        .unwrap();
    assert_eq!(a.plaintext.len(), 26);
    assert!(a.expiry.is_some());

    let (login_id, b) = client
        .login(Credentials::new("a@b.com", "password1"))
        .await
        .unwrap();
    assert_eq!(login_id, user_id);
    assert_ne!(a.plaintext, b.plaintext);

    let session = client.is_auth(&a.plaintext).await.unwrap();
    assert_eq!(session.user_id, user_id);
    assert_eq!(session.hash, a.hash);

    client.logout(&a.plaintext).await.unwrap();
    assert!(matches!(client.is_auth(&a.plaintext).await, Err(AppError::Authentication(_))));
    assert!(client.is_auth(&b.plaintext).await.is_ok());

    shutdown.cancel();
}

#[tokio::test]
async fn test_rpc_error_categories_survive_the_wire() {
    let shutdown = CancellationToken::new();
    let url = spawn_account_service(shutdown.clone()).await;
    let client = connect(&url).await;

    client
        .sign_up(Credentials::new("a@b.com", "password1"))
        .await
        .unwrap();
    assert!(matches!(
        client.sign_up(Credentials::new("a@b.com", "password1")).await,
        Err(AppError::DuplicateEmail)
    ));
    assert!(matches!(
        client.login(Credentials::new("x@b.com", "password1")).await,
        Err(AppError::RecordNotFound(_))
    ));
    assert!(matches!(
        client.login(Credentials::new("a@b.com", "password2")).await,
        Err(AppError::Authentication(_))
    ));

    let Err(AppError::Validation(fields)) = client.sign_up(Credentials::new("", "")).await else {
        panic!("expected validation error");
    };
    assert!(fields.contains("email"));
    assert!(fields.contains("password"));

    shutdown.cancel();
}

#[tokio::test]
async fn test_connect_fails_without_account_service() {
    // Bind then drop to get a port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = RpcAccountClient::connect(
        &format!("http://{addr}"),
        Duration::from_secs(1),
        Duration::from_secs(1),
        Span::none(),
    )
    .await;
    assert!(matches!(result, Err(AppError::Internal(_))));
}

#[tokio::test]
async fn test_gateway_over_rpc() {
    let shutdown = CancellationToken::new();
    let url = spawn_account_service(shutdown.clone()).await;
    let app = gateway(Arc::new(connect(&url).await), None);

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/v1/signup",
            Some(json!({ "user": { "email": "a@b.com", "password": "password1" } })),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let token = body_json(response).await["token"]["plaintext"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/v1/calendar", None, Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(request(Method::GET, "/v1/healthcheck", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "available" }));

    shutdown.cancel();
}
