//! Session lifecycle: issuing, refreshing and revoking token pairs.

use std::sync::Arc;

use tracing::{debug, info};

use crate::auth::AuthError;
use crate::auth::credentials::{CredentialService, NewUser};
use crate::db::{CredentialStore, PublicUser};
use crate::jwt::TokenCodec;

/// An access/refresh pair minted for one registration or login.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Orchestrates the credential service, the token codec and the refresh
/// token store for the session operations.
#[derive(Clone)]
pub struct SessionController<S> {
    codec: Arc<TokenCodec>,
    store: S,
    credentials: CredentialService<S>,
}

impl<S: CredentialStore> SessionController<S> {
    pub fn new(codec: Arc<TokenCodec>, store: S) -> Self {
        let credentials = CredentialService::new(store.clone());
        Self {
            codec,
            store,
            credentials,
        }
    }

    /// Registers a user and immediately starts a session for them.
    pub async fn register(&self, new_user: NewUser) -> Result<(PublicUser, TokenPair), AuthError> {
        let user = self.credentials.register(new_user).await?;
        let tokens = self.issue_tokens(&user).await?;
        Ok((user, tokens))
    }

    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(PublicUser, TokenPair), AuthError> {
        let user = self.credentials.authenticate(username, password).await?;
        let tokens = self.issue_tokens(&user).await?;
        info!(username = %user.username, "user logged in");
        Ok((user, tokens))
    }

    /// Exchanges a live refresh token for a fresh access token.
    ///
    /// Order matters: signature and expiry first, then the revocation
    /// check against storage, then a re-read of the user so the new
    /// access token carries current identity claims. The refresh token
    /// itself stays valid until logout.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let claims = self
            .codec
            .validate_refresh_token(refresh_token)
            .map_err(|_| AuthError::InvalidToken)?;

        if !self.store.refresh_token_exists(refresh_token).await? {
            debug!(sub = claims.sub, "refresh token not found in store");
            return Err(AuthError::TokenRevoked);
        }

        let user: PublicUser = self
            .store
            .find_user_by_id(claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)?
            .into();

        Ok(self.codec.generate_access_token(&user)?)
    }

    /// Revokes a refresh token. Always succeeds: logging out with a
    /// missing, unknown or malformed token is a no-op.
    pub async fn logout(&self, refresh_token: Option<&str>) -> Result<(), AuthError> {
        if let Some(token) = refresh_token {
            let removed = self.store.delete_refresh_token(token).await?;
            if removed {
                debug!("refresh token revoked");
            }
        }
        Ok(())
    }

    async fn issue_tokens(&self, user: &PublicUser) -> Result<TokenPair, AuthError> {
        let access_token = self.codec.generate_access_token(user)?;
        let refresh_token = self.codec.generate_refresh_token(user.id)?;
        self.store
            .insert_refresh_token(user.id, &refresh_token)
            .await?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::MemStore;

    fn codec() -> Arc<TokenCodec> {
        Arc::new(TokenCodec::new(
            b"unit-test-access-secret-0123456789",
            b"unit-test-refresh-secret-0123456789",
            900,
            1_209_600,
        ))
    }

    fn controller() -> (SessionController<MemStore>, MemStore) {
        let store = MemStore::default();
        (SessionController::new(codec(), store.clone()), store)
    }

    fn alice() -> NewUser {
        NewUser {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "Secret1!".into(),
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn register_issues_pair_and_persists_refresh_token() {
        let (sessions, store) = controller();
        let (user, pair) = sessions.register(alice()).await.unwrap();

        assert_eq!(user.username, "alice");
        assert_ne!(pair.access_token, pair.refresh_token);
        assert_eq!(store.token_count(), 1);
        assert!(
            store
                .refresh_token_exists(&pair.refresh_token)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn each_login_persists_another_refresh_token() {
        let (sessions, store) = controller();
        sessions.register(alice()).await.unwrap();
        sessions.login("alice", "Secret1!").await.unwrap();

        assert_eq!(store.token_count(), 2);
    }

    #[tokio::test]
    async fn refresh_mints_access_token_without_rotating() {
        let (sessions, store) = controller();
        let (user, pair) = sessions.register(alice()).await.unwrap();

        let access = sessions.refresh(&pair.refresh_token).await.unwrap();
        let claims = codec().validate_access_token(&access).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "alice");

        // The original refresh token is still live.
        assert_eq!(store.token_count(), 1);
        assert!(sessions.refresh(&pair.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn refresh_rejects_an_access_token() {
        let (sessions, _store) = controller();
        let (_user, pair) = sessions.register(alice()).await.unwrap();

        let err = sessions.refresh(&pair.access_token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn refresh_rejects_garbage() {
        let (sessions, _store) = controller();
        let err = sessions.refresh("not-a-token").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn refresh_after_logout_reports_revocation() {
        let (sessions, _store) = controller();
        let (_user, pair) = sessions.register(alice()).await.unwrap();

        sessions.logout(Some(&pair.refresh_token)).await.unwrap();

        let err = sessions.refresh(&pair.refresh_token).await.unwrap_err();
        assert_eq!(err.to_string(), "Refresh token has been revoked.");
    }

    #[tokio::test]
    async fn refresh_for_vanished_user_fails_closed() {
        let (sessions, store) = controller();
        // A syntactically valid refresh token for a user id that was
        // never created, with a matching store row.
        let token = codec().generate_refresh_token(999).unwrap();
        store.insert_refresh_token(999, &token).await.unwrap();

        let err = sessions.refresh(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let (sessions, store) = controller();
        let (_user, pair) = sessions.register(alice()).await.unwrap();

        sessions.logout(Some(&pair.refresh_token)).await.unwrap();
        sessions.logout(Some(&pair.refresh_token)).await.unwrap();
        sessions.logout(Some("never-issued")).await.unwrap();
        sessions.logout(None).await.unwrap();

        assert_eq!(store.token_count(), 0);
    }

    #[tokio::test]
    async fn logout_surfaces_storage_failure() {
        let (sessions, store) = controller();
        let (_user, pair) = sessions.register(alice()).await.unwrap();

        store.break_storage();
        let err = sessions.logout(Some(&pair.refresh_token)).await.unwrap_err();
        assert!(matches!(err, AuthError::Storage(_)));
    }
}
