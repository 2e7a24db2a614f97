mod auth;
mod error;
mod users;

use std::sync::Arc;

use axum::Router;

use crate::auth::{CredentialService, SessionController};
use crate::db::Database;
use crate::jwt::TokenCodec;
use crate::rate_limit::RateLimitConfig;

pub use auth::REFRESH_TOKEN_HEADER;
pub use error::{ApiError, ResultExt};

/// Create the API router.
pub fn create_api_router(
    db: Database,
    codec: Arc<TokenCodec>,
    rate_limits: Arc<RateLimitConfig>,
) -> Router {
    let auth_state = auth::AuthState {
        sessions: SessionController::new(codec.clone(), db.clone()),
        rate_limits,
    };

    let users_state = users::UsersState {
        credentials: CredentialService::new(db.clone()),
        db,
        codec,
    };

    Router::new()
        .nest("/auth", auth::router(auth_state))
        .nest("/users", users::router(users_state))
}
