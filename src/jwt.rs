//! JWT token generation and validation.
//!
//! Two token kinds signed against two independent secrets: short-lived
//! access tokens carrying full identity claims (stateless, never persisted)
//! and longer-lived refresh tokens carrying only the subject (persisted and
//! revocable). Verification dispatches on the kind the caller asked for;
//! a token of one kind never validates as the other.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::db::PublicUser;

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user id)
    pub sub: i64,
    /// Username
    pub username: String,
    /// Email
    pub email: String,
    /// Admin flag
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// JWT claims for refresh tokens. Deliberately narrow: identity details are
/// re-fetched from storage at refresh time so they are never stale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Subject (user id)
    pub sub: i64,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Signing key pair plus TTL for one token kind.
#[derive(Clone)]
struct TokenParams {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: u64,
}

impl TokenParams {
    fn new(secret: &[u8], ttl_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }
}

/// Creates and verifies both token kinds. Holds one key/TTL pair per kind
/// so that compromise of one secret never compromises the other.
#[derive(Clone)]
pub struct TokenCodec {
    access: TokenParams,
    refresh: TokenParams,
}

impl TokenCodec {
    pub fn new(
        access_secret: &[u8],
        refresh_secret: &[u8],
        access_ttl_secs: u64,
        refresh_ttl_secs: u64,
    ) -> Self {
        Self {
            access: TokenParams::new(access_secret, access_ttl_secs),
            refresh: TokenParams::new(refresh_secret, refresh_ttl_secs),
        }
    }

    /// Generate an access token carrying the user's full identity claims.
    ///
    /// A partial token is worse than no token: every identity field must be
    /// present or generation fails listing the offending claims. An admin
    /// flag of `false` is a valid value, not a missing one.
    pub fn generate_access_token(&self, user: &PublicUser) -> Result<String, TokenError> {
        let mut missing = Vec::new();
        if user.id <= 0 {
            missing.push("sub");
        }
        if user.username.is_empty() {
            missing.push("username");
        }
        if user.email.is_empty() {
            missing.push("email");
        }
        if !missing.is_empty() {
            return Err(TokenError::InvalidInput { fields: missing });
        }

        let now = unix_now()?;
        let claims = AccessClaims {
            sub: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            iat: now,
            exp: now + self.access.ttl_secs,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.access.encoding_key)
            .map_err(TokenError::Encoding)
    }

    /// Generate a refresh token for a user id.
    pub fn generate_refresh_token(&self, user_id: i64) -> Result<String, TokenError> {
        if user_id <= 0 {
            return Err(TokenError::InvalidInput { fields: vec!["sub"] });
        }

        let now = unix_now()?;
        let claims = RefreshClaims {
            sub: user_id,
            iat: now,
            exp: now + self.refresh.ttl_secs,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.refresh.encoding_key)
            .map_err(TokenError::Encoding)
    }

    /// Validate and decode an access token.
    ///
    /// All failure causes (bad signature, expired, malformed, wrong shape)
    /// collapse into the single opaque [`TokenError::Verification`]; callers
    /// must not be able to distinguish them. The cause is logged at debug
    /// level server-side only.
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        jsonwebtoken::decode::<AccessClaims>(token, &self.access.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("access token validation failed: {e}");
                TokenError::Verification
            })
    }

    /// Validate and decode a refresh token. Same opaque-failure contract as
    /// [`Self::validate_access_token`].
    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        jsonwebtoken::decode::<RefreshClaims>(token, &self.refresh.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("refresh token validation failed: {e}");
                TokenError::Verification
            })
    }
}

fn unix_now() -> Result<u64, TokenError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| TokenError::Time)?
        .as_secs())
}

/// Errors that can occur during token operations.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Token input is missing required identity fields
    #[error("user record is missing valid {} claim values", .fields.join(", "))]
    InvalidInput { fields: Vec<&'static str> },
    /// Error encoding the token
    #[error("failed to encode token: {0}")]
    Encoding(jsonwebtoken::errors::Error),
    /// Signature, expiry, or shape check failed; cause intentionally opaque
    #[error("failed to verify token")]
    Verification,
    /// System time error
    #[error("system time error")]
    Time,
}
