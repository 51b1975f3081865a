// ==============================
// tests/unit/password_tests.rs
// ==============================
use backend_lib::auth::{CredentialHasher, PasswordError};
use backend_lib::validation::validate_credentials;

use crate::test_utils::TEST_PASSWORD_COST;

#[test]
fn test_password_hashing_and_verification() {
    let hasher = CredentialHasher::new(TEST_PASSWORD_COST).unwrap();
    let password = "SecureP@ssw0rd";
    let digest = hasher.hash(password).unwrap();

    // Hash should be different than the original password
    assert_ne!(digest.as_str(), password);
    assert!(hasher.verify(digest.as_str(), password).unwrap());

    // Every single-character mutation is a clean mismatch
    for i in 0..password.len() {
        let mut mutated = password.as_bytes().to_vec();
        mutated[i] ^= 0x01;
        let mutated = String::from_utf8(mutated).unwrap();
        assert!(!hasher.verify(digest.as_str(), &mutated).unwrap(), "{mutated}");
    }
}

#[test]
fn test_malformed_hash_is_an_error() {
    let hasher = CredentialHasher::new(TEST_PASSWORD_COST).unwrap();
    assert!(matches!(
        hasher.verify("$2a$12$not-a-scrypt-hash", "password1"),
        Err(PasswordError::MalformedHash) | Err(PasswordError::Hash(_))
    ));
    assert!(matches!(hasher.verify("", "password1"), Err(PasswordError::MalformedHash)));
}

#[test]
fn test_cost_is_embedded() {
    let hasher = CredentialHasher::new(5).unwrap();
    assert_eq!(hasher.cost(), 5);
    assert!(hasher.hash("password1").unwrap().as_str().starts_with("$scrypt$ln=5,"));
}

#[test]
fn test_password_validation() {
    // Valid password
    assert!(validate_credentials("a@b.com", "password1").is_ok());

    // Too short
    let errors = validate_credentials("a@b.com", "Short1").unwrap_err();
    assert!(errors.contains("password"));

    // Too long for the hash input
    assert!(validate_credentials("a@b.com", &"p".repeat(73)).is_err());
}
