/// Integration tests for crypto-core token and signature helpers
///
/// This test module covers:
/// - Token round trips through independently constructed managers
/// - Distinguishing expired from tampered tokens
/// - Upload and newsletter signature helpers
use crypto_core::hash::{hmac_sha1_hex, hmac_sha256_hex, sha256_hex};
use crypto_core::jwt::{JwtManager, TokenError};
use uuid::Uuid;

const TEST_SECRET: &str = "integration-secret-integration-secret";

#[test]
fn test_token_validates_across_manager_instances() {
    let issuer = JwtManager::new(TEST_SECRET, 600);
    let verifier = JwtManager::new(TEST_SECRET, 600);

    let user_id = Uuid::new_v4();
    let token = issuer
        .generate_token(user_id, "reader@example.com")
        .expect("Failed to generate token");

    let claims = verifier.validate_token(&token).expect("token should validate");
    assert_eq!(claims.sub, user_id.to_string());
    assert_eq!(claims.exp - claims.iat, 600);
}

#[test]
fn test_tampered_payload_is_rejected() {
    let manager = JwtManager::new(TEST_SECRET, 600);
    let token = manager
        .generate_token(Uuid::new_v4(), "reader@example.com")
        .unwrap();

    let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
    parts[1] = format!("{}A", parts[1]);
    let tampered = parts.join(".");

    assert!(matches!(
        manager.validate_token(&tampered),
        Err(TokenError::Invalid(_))
    ));
}

#[test]
fn test_expired_token_is_distinct_from_invalid() {
    let manager = JwtManager::new(TEST_SECRET, -60);
    let token = manager
        .generate_token(Uuid::new_v4(), "reader@example.com")
        .unwrap();
    assert_eq!(manager.validate_token(&token), Err(TokenError::Expired));
}

#[test]
fn test_upload_signature_depends_on_token_and_expiry() {
    let key = b"private_key";
    let a = hmac_sha1_hex(key, b"token-a1700000000");
    let b = hmac_sha1_hex(key, b"token-a1700000001");
    assert_eq!(a.len(), 40);
    assert_ne!(a, b);
}

#[test]
fn test_confirmation_token_is_stable_for_same_input() {
    let a = hmac_sha256_hex(b"secret", b"user@example.com1700000000000");
    let b = hmac_sha256_hex(b"secret", b"user@example.com1700000000000");
    assert_eq!(a, b);
    assert_ne!(a, sha256_hex("user@example.com1700000000000"));
}
