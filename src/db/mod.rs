mod token;
mod user;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub use token::RefreshTokenStore;
pub use user::{PublicUser, UserRecord, UserStore};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open or create a database at the given path.
    /// Use ":memory:" for an in-memory database.
    pub async fn open(path: &str) -> Result<Self, sqlx::Error> {
        let url = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", path)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get the current schema version.
    async fn get_version(&self) -> Result<i32, sqlx::Error> {
        let result: Option<(i32,)> = sqlx::query_as("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(result.map(|r| r.0).unwrap_or(0))
    }

    /// Set the schema version within a transaction.
    async fn set_version(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        version: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM schema_version")
            .execute(&mut **tx)
            .await?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(version)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Run database migrations.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
            .execute(&self.pool)
            .await?;

        let version = self.get_version().await?;

        if version < 1 {
            self.migrate_v1().await?;
        }

        Ok(())
    }

    /// Execute a list of queries in a transaction, then set the version.
    async fn run_migration(
        &self,
        version: i32,
        queries: &[&'static str],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for query in queries {
            sqlx::query(*query).execute(&mut *tx).await?;
        }
        Self::set_version(&mut tx, version).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn migrate_v1(&self) -> Result<(), sqlx::Error> {
        self.run_migration(
            1,
            &[
                // Users table
                "CREATE TABLE users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    username TEXT UNIQUE NOT NULL,
                    email TEXT UNIQUE NOT NULL,
                    password_hash TEXT NOT NULL,
                    is_admin INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_users_username ON users(username)",
                "CREATE INDEX idx_users_email ON users(email)",
                // Refresh tokens table. No expiry column: expiry is inside
                // the signed token, a row only marks the token as not yet
                // revoked.
                "CREATE TABLE refresh_tokens (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    token TEXT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_refresh_tokens_token ON refresh_tokens(token)",
                "CREATE INDEX idx_refresh_tokens_user_id ON refresh_tokens(user_id)",
            ],
        )
        .await
    }

    /// Get the user store.
    pub fn users(&self) -> UserStore {
        UserStore::new(self.pool.clone())
    }

    /// Get the refresh token store.
    pub fn refresh_tokens(&self) -> RefreshTokenStore {
        RefreshTokenStore::new(self.pool.clone())
    }

    /// Get the underlying connection pool (for tests that need raw SQL access).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Query seam consumed by the credential service and session controller.
///
/// [`Database`] is the production implementation; tests substitute an
/// in-memory double, which is the reason this is a trait rather than the
/// concrete type.
#[allow(async_fn_in_trait)]
pub trait CredentialStore: Clone + Send + Sync + 'static {
    async fn find_user_by_username(&self, username: &str)
    -> Result<Option<UserRecord>, sqlx::Error>;

    async fn find_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, sqlx::Error>;

    async fn username_taken(&self, username: &str) -> Result<bool, sqlx::Error>;

    async fn email_taken(&self, email: &str) -> Result<bool, sqlx::Error>;

    /// Insert a user, returning the assigned id.
    async fn insert_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<i64, sqlx::Error>;

    async fn insert_refresh_token(&self, user_id: i64, token: &str) -> Result<(), sqlx::Error>;

    async fn refresh_token_exists(&self, token: &str) -> Result<bool, sqlx::Error>;

    /// Returns whether a row matched; deleting an absent token is not an error.
    async fn delete_refresh_token(&self, token: &str) -> Result<bool, sqlx::Error>;
}

impl CredentialStore for Database {
    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        self.users().get_by_username(username).await
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, sqlx::Error> {
        self.users().get_by_id(id).await
    }

    async fn username_taken(&self, username: &str) -> Result<bool, sqlx::Error> {
        self.users().username_taken(username).await
    }

    async fn email_taken(&self, email: &str) -> Result<bool, sqlx::Error> {
        self.users().email_taken(email).await
    }

    async fn insert_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<i64, sqlx::Error> {
        self.users()
            .create(username, email, password_hash, is_admin)
            .await
    }

    async fn insert_refresh_token(&self, user_id: i64, token: &str) -> Result<(), sqlx::Error> {
        self.refresh_tokens().create(user_id, token).await?;
        Ok(())
    }

    async fn refresh_token_exists(&self, token: &str) -> Result<bool, sqlx::Error> {
        self.refresh_tokens().exists(token).await
    }

    async fn delete_refresh_token(&self, token: &str) -> Result<bool, sqlx::Error> {
        self.refresh_tokens().delete(token).await
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get_user() {
        let db = Database::open(":memory:").await.unwrap();

        let id = db
            .users()
            .create("alice", "alice@example.com", "hash", false)
            .await
            .unwrap();

        let user = db.users().get_by_username("alice").await.unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.password_hash, "hash");
        assert!(!user.is_admin);

        let user = db.users().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn test_duplicate_username_fails() {
        let db = Database::open(":memory:").await.unwrap();

        db.users()
            .create("alice", "a1@example.com", "hash", false)
            .await
            .unwrap();
        let result = db
            .users()
            .create("alice", "a2@example.com", "hash", false)
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_email_fails() {
        let db = Database::open(":memory:").await.unwrap();

        db.users()
            .create("alice", "same@example.com", "hash", false)
            .await
            .unwrap();
        let result = db
            .users()
            .create("bob", "same@example.com", "hash", false)
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_taken_checks() {
        let db = Database::open(":memory:").await.unwrap();

        assert!(!db.users().username_taken("alice").await.unwrap());
        assert!(!db.users().email_taken("alice@example.com").await.unwrap());

        db.users()
            .create("alice", "alice@example.com", "hash", false)
            .await
            .unwrap();

        assert!(db.users().username_taken("alice").await.unwrap());
        assert!(db.users().email_taken("alice@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_partial_update_keeps_unset_fields() {
        let db = Database::open(":memory:").await.unwrap();

        db.users()
            .create("alice", "old@example.com", "hash", true)
            .await
            .unwrap();

        let updated = db
            .users()
            .update("alice", None, Some("new@example.com"), None)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.username, "alice");
        assert_eq!(updated.email, "new@example.com");
        assert_eq!(updated.password_hash, "hash");
        assert!(updated.is_admin);
    }

    #[tokio::test]
    async fn test_update_missing_user_returns_none() {
        let db = Database::open(":memory:").await.unwrap();

        let updated = db
            .users()
            .update("ghost", None, Some("x@example.com"), None)
            .await
            .unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn test_refresh_token_lifecycle() {
        let db = Database::open(":memory:").await.unwrap();

        let user_id = db
            .users()
            .create("alice", "alice@example.com", "hash", false)
            .await
            .unwrap();

        let tokens = db.refresh_tokens();
        tokens.create(user_id, "token-a").await.unwrap();

        assert!(tokens.exists("token-a").await.unwrap());
        assert!(!tokens.exists("token-b").await.unwrap());

        assert!(tokens.delete("token-a").await.unwrap());
        assert!(!tokens.exists("token-a").await.unwrap());

        // Deleting again matches nothing but is not an error.
        assert!(!tokens.delete("token-a").await.unwrap());
    }

    #[tokio::test]
    async fn test_deleting_user_cascades_tokens() {
        let db = Database::open(":memory:").await.unwrap();

        let user_id = db
            .users()
            .create("alice", "alice@example.com", "hash", false)
            .await
            .unwrap();

        let tokens = db.refresh_tokens();
        tokens.create(user_id, "token-a").await.unwrap();
        tokens.create(user_id, "token-b").await.unwrap();
        assert_eq!(tokens.count_for_user(user_id).await.unwrap(), 2);

        assert!(db.users().delete("alice").await.unwrap());
        assert_eq!(tokens.count_for_user(user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_older_than() {
        let db = Database::open(":memory:").await.unwrap();

        let user_id = db
            .users()
            .create("alice", "alice@example.com", "hash", false)
            .await
            .unwrap();

        let tokens = db.refresh_tokens();
        tokens.create(user_id, "fresh").await.unwrap();
        tokens.create(user_id, "stale").await.unwrap();

        // Backdate one row past the cutoff.
        sqlx::query(
            "UPDATE refresh_tokens SET created_at = datetime('now', '-10 days') WHERE token = ?",
        )
        .bind("stale")
        .execute(db.pool())
        .await
        .unwrap();

        let removed = tokens.delete_older_than(7 * 24 * 60 * 60).await.unwrap();
        assert_eq!(removed, 1);
        assert!(tokens.exists("fresh").await.unwrap());
        assert!(!tokens.exists("stale").await.unwrap());
    }
}
