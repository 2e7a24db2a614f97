//! User registration and password authentication.

use tracing::info;

use crate::auth::AuthError;
use crate::db::{CredentialStore, PublicUser};
use crate::password::{hash_password, verify_password};

/// A registration request whose fields already passed format validation.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub is_admin: bool,
}

/// Registers users and checks passwords against stored hashes.
///
/// Generic over [`CredentialStore`] so tests can swap in the in-memory
/// double instead of SQLite.
#[derive(Clone)]
pub struct CredentialService<S> {
    store: S,
}

impl<S: CredentialStore> CredentialService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates a user account. Username and email uniqueness are
    /// checked up front so the caller gets a precise message instead of
    /// a bare constraint violation.
    pub async fn register(&self, new_user: NewUser) -> Result<PublicUser, AuthError> {
        if self.store.username_taken(&new_user.username).await? {
            return Err(AuthError::DuplicateUsername(new_user.username));
        }
        if self.store.email_taken(&new_user.email).await? {
            return Err(AuthError::DuplicateEmail(new_user.email));
        }

        let password_hash = hash_password(&new_user.password)?;
        let id = self
            .store
            .insert_user(
                &new_user.username,
                &new_user.email,
                &password_hash,
                new_user.is_admin,
            )
            .await?;
        info!(username = %new_user.username, id, "registered user");

        Ok(PublicUser {
            id,
            username: new_user.username,
            email: new_user.email,
            is_admin: new_user.is_admin,
        })
    }

    /// Checks a username/password pair. An unknown username and a wrong
    /// password fail with distinct errors.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<PublicUser, AuthError> {
        let record = self
            .store
            .find_user_by_username(username)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !verify_password(password, &record.password_hash)? {
            return Err(AuthError::InvalidPassword);
        }

        Ok(record.into())
    }

    /// Username lookup for profile routes. Absence here is a missing
    /// resource, not an authentication failure.
    pub async fn find_by_username(&self, username: &str) -> Result<PublicUser, AuthError> {
        let record = self
            .store
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AuthError::UnknownUser(username.to_string()))?;
        Ok(record.into())
    }
}
