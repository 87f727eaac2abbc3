//! Authentication service for credential verification and JWT handling
//!
//! Provides:
//! - Password hashing with bcrypt (one salted hash per user)
//! - JWT token generation and validation

use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{Database, DbError, UserRecord};

/// Claims embedded in an issued token. The token is self-contained: the
/// signature asserts identity without a database lookup, after which the
/// request handler re-fetches the user for current data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User id (hex ObjectId, subject)
    pub sub: String,
    /// Username
    pub username: String,
    /// Favourite genre at issue time
    pub favourite_genre: String,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("wrong credentials")]
    InvalidCredentials,

    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error(transparent)]
    Db(#[from] DbError),
}

/// Auth service configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWT signing secret
    pub jwt_secret: String,
    /// Token lifetime in seconds (default: 24 hours)
    pub token_lifetime: i64,
    /// Bcrypt cost factor
    pub bcrypt_cost: u32,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            token_lifetime: std::env::var("TOKEN_LIFETIME")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(24 * 60 * 60),
            bcrypt_cost: std::env::var("BCRYPT_COST")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_COST),
        }
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: Database,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(db: Database, config: AuthConfig) -> Self {
        Self { db, config }
    }

    /// Login with username and password, returning a signed token.
    ///
    /// An unknown username and a failed password check are indistinguishable
    /// to the caller: both surface as `InvalidCredentials`.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let user = self
            .db
            .users()
            .get_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        self.issue_token(&user)
    }

    /// Hash a password with bcrypt
    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        Ok(hash(password, self.config.bcrypt_cost)?)
    }

    /// Verify a password against a stored hash
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        Ok(verify(password, hash)?)
    }

    /// Sign a token embedding the user's identity
    pub fn issue_token(&self, user: &UserRecord) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.token_lifetime);

        let claims = TokenClaims {
            sub: user.id.to_hex(),
            username: user.username.clone(),
            favourite_genre: user.favourite_genre.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )?)
    }

    /// Verify a token's signature and decode its claims
    pub fn decode_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data = decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use bson::oid::ObjectId;
    use pretty_assertions::assert_eq;

    async fn test_service(secret: &str) -> AuthService {
        let db = Database::connect("mongodb://localhost:27017", "library_test")
            .await
            .unwrap();
        AuthService::new(
            db,
            AuthConfig {
                jwt_secret: secret.to_string(),
                token_lifetime: 60 * 60,
                bcrypt_cost: 4, // minimum cost, keeps the tests fast
            },
        )
    }

    fn test_user() -> UserRecord {
        UserRecord {
            id: ObjectId::new(),
            username: "ada".to_string(),
            favourite_genre: "crime".to_string(),
            password_hash: String::new(),
        }
    }

    #[tokio::test]
    async fn test_password_hash_roundtrip() {
        let auth = test_service("s3cret").await;
        let hash = auth.hash_password("patterns").unwrap();

        assert_ne!(hash, "patterns");
        assert!(auth.verify_password("patterns", &hash).unwrap());
        assert!(!auth.verify_password("wrong", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_token_roundtrip_preserves_identity() {
        let auth = test_service("s3cret").await;
        let user = test_user();

        let token = auth.issue_token(&user).unwrap();
        let claims = auth.decode_token(&token).unwrap();

        assert_eq!(claims.sub, user.id.to_hex());
        assert_eq!(claims.username, "ada");
        assert_eq!(claims.favourite_genre, "crime");
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn test_token_rejected_with_wrong_secret() {
        let issuer = test_service("secret-a").await;
        let verifier = test_service("secret-b").await;

        let token = issuer.issue_token(&test_user()).unwrap();
        assert_matches!(verifier.decode_token(&token), Err(AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn test_tampered_token_rejected() {
        let auth = test_service("s3cret").await;
        let mut token = auth.issue_token(&test_user()).unwrap();
        token.push('x');

        assert_matches!(auth.decode_token(&token), Err(AuthError::InvalidToken(_)));
    }
}
