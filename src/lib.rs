pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod password;
pub mod rate_limit;
pub mod validate;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tracing::{error, info};

use api::{ApiError, create_api_router};
use db::Database;
use jwt::TokenCodec;
use rate_limit::RateLimitConfig;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Signing secret for access tokens
    pub access_secret: Vec<u8>,
    /// Signing secret for refresh tokens (independent of the access secret)
    pub refresh_secret: Vec<u8>,
    /// Access token lifetime in seconds
    pub access_ttl_secs: u64,
    /// Refresh token lifetime in seconds
    pub refresh_ttl_secs: u64,
    /// Per-IP limiters for the register and login endpoints
    pub rate_limits: Arc<RateLimitConfig>,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let codec = Arc::new(TokenCodec::new(
        &config.access_secret,
        &config.refresh_secret,
        config.access_ttl_secs,
        config.refresh_ttl_secs,
    ));

    create_api_router(config.db.clone(), codec, config.rate_limits.clone()).fallback(not_found)
}

/// Unroutable paths get the regular error envelope rather than axum's
/// bare 404.
async fn not_found() -> ApiError {
    ApiError::not_found("Not Found")
}

/// Delete refresh-token rows older than the refresh TTL. Rows that old
/// hold tokens past their signed expiry, so dropping them changes no
/// outcome. Call once before starting the server; there is no background
/// scheduler.
pub async fn prune_stale_tokens(db: &Database, refresh_ttl_secs: u64) {
    match db.refresh_tokens().delete_older_than(refresh_ttl_secs).await {
        Ok(count) if count > 0 => info!("Pruned {} stale refresh tokens", count),
        Ok(_) => {}
        Err(e) => error!("Failed to prune stale refresh tokens: {}", e),
    }
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}
