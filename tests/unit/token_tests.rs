// ==============================
// tests/unit/token_tests.rs
// ==============================
//! Token issuance and session store behavior through the public API
use backend_lib::auth::{
    generate_token, hash_plaintext, validate_token_shape, SessionError, SessionStore, SESSION_TTL,
};
use backend_lib::storage::MemoryKvStore;
use data_encoding::BASE32_NOPAD;
use kalenderium_common::Scope;
use std::{collections::HashSet, sync::Arc, time::Duration};
use tracing::Span;

#[test]
fn test_generated_tokens_have_expected_shape() {
    let mut seen = HashSet::new();
    for user_id in 0..50 {
        let token = generate_token(user_id, SESSION_TTL, Scope::Authentication).unwrap();

        assert_eq!(token.plaintext.len(), 26);
        assert_eq!(BASE32_NOPAD.decode(token.plaintext.as_bytes()).unwrap().len(), 16);
        assert_eq!(token.hash, hash_plaintext(&token.plaintext));
        assert!(validate_token_shape(&token.plaintext).is_ok());
        assert!(seen.insert(token.plaintext));
    }
}

#[tokio::test(start_paused = true)]
async fn test_session_lifecycle() {
    let sessions = SessionStore::new(
        Arc::new(MemoryKvStore::new()),
        Duration::from_secs(3),
        Span::none(),
    );
    let short = generate_token(1, Duration::from_secs(30), Scope::Authentication).unwrap();
    let long = generate_token(2, SESSION_TTL, Scope::Authentication).unwrap();
    sessions.set(&short).await.unwrap();
    sessions.set(&long).await.unwrap();

    assert_eq!(sessions.get(&short.plaintext).await.unwrap().user_id, 1);

    tokio::time::advance(Duration::from_secs(31)).await;
    assert!(matches!(sessions.get(&short.plaintext).await, Err(SessionError::NotFound)));
    assert_eq!(sessions.get(&long.plaintext).await.unwrap().user_id, 2);

    sessions.delete(&long.hash).await.unwrap();
    assert!(matches!(sessions.get(&long.plaintext).await, Err(SessionError::NotFound)));
}
