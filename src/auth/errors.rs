//! Domain errors produced by the credential and session services.

use crate::jwt::TokenError;
use crate::password::PasswordError;

/// Everything that can go wrong between an auth request and a token.
///
/// The `Display` text of the expected variants is exactly what the
/// client sees. Unexpected variants (`Storage`, `Hashing`, `Token`)
/// are masked at the API boundary and only logged server side.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Username '{0}' is already taken.")]
    DuplicateUsername(String),

    #[error("Email '{0}' is already taken.")]
    DuplicateEmail(String),

    /// Login attempt for a username that does not exist.
    #[error("User not found.")]
    UserNotFound,

    #[error("Invalid password.")]
    InvalidPassword,

    #[error("No refresh token provided.")]
    MissingRefreshToken,

    /// The presented token failed verification. Deliberately carries no
    /// cause; the codec logs the specifics at debug level.
    #[error("Failed to verify token.")]
    InvalidToken,

    /// The refresh token verified cryptographically but has no matching
    /// row in storage, i.e. it was logged out or pruned.
    #[error("Refresh token has been revoked.")]
    TokenRevoked,

    /// Lookup of a user by username came up empty (404, not a login
    /// failure).
    #[error("Unable to find user: {0}")]
    UnknownUser(String),

    #[error("token generation failed: {0}")]
    Token(#[from] TokenError),

    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("password hashing failure: {0}")]
    Hashing(#[from] PasswordError),
}
