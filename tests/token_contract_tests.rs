//! Wire-contract tests for the issued bearer tokens
//!
//! The token is the one artifact that crosses process boundaries: clients
//! store it and replay it on later requests. These tests pin the claim
//! names and the signing scheme independently of the server internals.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Claims as they appear on the wire
#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct WireClaims {
    sub: String,
    username: String,
    favourite_genre: String,
    exp: i64,
    iat: i64,
}

fn sample_claims() -> WireClaims {
    let now = chrono::Utc::now().timestamp();
    WireClaims {
        sub: "65f1b2c8a4d9e0123456789a".to_string(),
        username: "ada".to_string(),
        favourite_genre: "crime".to_string(),
        exp: now + 3600,
        iat: now,
    }
}

// ============================================================================
// Claim Shape Tests
// ============================================================================

#[test]
fn test_claim_field_names_on_the_wire() {
    let json = serde_json::to_value(sample_claims()).unwrap();
    let object = json.as_object().unwrap();

    for key in ["sub", "username", "favourite_genre", "exp", "iat"] {
        assert!(object.contains_key(key), "missing claim `{key}`");
    }
    assert_eq!(object.len(), 5);
}

// ============================================================================
// Signing Round-trip Tests
// ============================================================================

#[test]
fn test_hs256_roundtrip() {
    let claims = sample_claims();
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap();

    let decoded = decode::<WireClaims>(
        &token,
        &DecodingKey::from_secret(b"test-secret"),
        &Validation::new(Algorithm::HS256),
    )
    .unwrap();

    assert_eq!(decoded.claims, claims);
}

#[test]
fn test_wrong_secret_rejected() {
    let token = encode(
        &Header::new(Algorithm::HS256),
        &sample_claims(),
        &EncodingKey::from_secret(b"secret-a"),
    )
    .unwrap();

    let result = decode::<WireClaims>(
        &token,
        &DecodingKey::from_secret(b"secret-b"),
        &Validation::new(Algorithm::HS256),
    );
    assert!(result.is_err());
}

#[test]
fn test_expired_token_rejected() {
    let mut claims = sample_claims();
    claims.iat -= 7200;
    claims.exp = claims.iat + 3600;

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap();

    let result = decode::<WireClaims>(
        &token,
        &DecodingKey::from_secret(b"test-secret"),
        &Validation::new(Algorithm::HS256),
    );
    assert!(result.is_err());
}

// ============================================================================
// Credential Hashing Tests
// ============================================================================

#[test]
fn test_bcrypt_hashes_are_salted_per_user() {
    let a = bcrypt::hash("patterns", 4).unwrap();
    let b = bcrypt::hash("patterns", 4).unwrap();

    // Same password, two accounts, two distinct salted hashes
    assert_ne!(a, b);
    assert!(bcrypt::verify("patterns", &a).unwrap());
    assert!(bcrypt::verify("patterns", &b).unwrap());
    assert!(!bcrypt::verify("wrong", &a).unwrap());
}
