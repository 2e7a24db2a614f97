//! Refresh token storage.
//!
//! Only refresh tokens are stored; presence of a row is what makes a
//! refresh token exchangeable, so deleting the row is revocation regardless
//! of the token's cryptographic expiry. Access tokens are stateless and
//! never touch this table. Expiry itself lives inside the signed token, so
//! rows carry no expiry column; rows older than the refresh TTL are pruned
//! at startup.

use sqlx::sqlite::SqlitePool;

/// Store for persisted refresh tokens.
#[derive(Clone)]
pub struct RefreshTokenStore {
    pool: SqlitePool,
}

impl RefreshTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a refresh token for a user. Returns the row id.
    pub async fn create(&self, user_id: i64, token: &str) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO refresh_tokens (user_id, token) VALUES (?, ?)")
            .bind(user_id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Whether a token string is still present (not revoked).
    pub async fn exists(&self, token: &str) -> Result<bool, sqlx::Error> {
        let count: (i32,) = sqlx::query_as("SELECT COUNT(*) FROM refresh_tokens WHERE token = ?")
            .bind(token)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 > 0)
    }

    /// Delete a token by its string (revoke). Returns whether a row matched;
    /// deleting an unknown token is not an error.
    pub async fn delete(&self, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete rows older than the given age. Tokens that old are past their
    /// signed expiry and can never verify again; the rows are dead weight.
    pub async fn delete_older_than(&self, max_age_secs: u64) -> Result<u64, sqlx::Error> {
        let modifier = format!("-{max_age_secs} seconds");
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE created_at < datetime('now', ?)")
            .bind(&modifier)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Number of stored tokens for a user.
    pub async fn count_for_user(&self, user_id: i64) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}
