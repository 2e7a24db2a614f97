//! User management API endpoints.
//!
//! - GET `/` - List all users (admin only)
//! - GET `/{username}` - Fetch one user (self or admin)
//! - PATCH `/{username}` - Update username, email or password (self or admin)
//! - DELETE `/{username}` - Remove a user and their sessions (self or admin)

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

use super::error::{ApiError, ResultExt, json_body, str_field};
use crate::auth::{AdminAuth, CredentialService, SelfOrAdmin};
use crate::db::{Database, PublicUser};
use crate::impl_has_token_codec;
use crate::jwt::TokenCodec;
use crate::password::hash_password;
use crate::validate::{validate_email, validate_password, validate_username};

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub codec: Arc<TokenCodec>,
    pub credentials: CredentialService<Database>,
}

impl_has_token_codec!(UsersState);

pub fn router(state: UsersState) -> Router {
    Router::new()
        .route("/", get(list_users))
        .route(
            "/{username}",
            get(find_user).patch(update_user).delete(delete_user),
        )
        .with_state(state)
}

/// List every account, ordered by username.
async fn list_users(
    State(state): State<UsersState>,
    AdminAuth(_claims): AdminAuth,
) -> Result<impl IntoResponse, ApiError> {
    let users: Vec<PublicUser> = state
        .db
        .users()
        .list()
        .await
        .db_err("Failed to list users")?
        .into_iter()
        .map(PublicUser::from)
        .collect();

    Ok((StatusCode::OK, Json(users)))
}

async fn find_user(
    State(state): State<UsersState>,
    SelfOrAdmin(_claims): SelfOrAdmin,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.credentials.find_by_username(&username).await?;
    Ok((StatusCode::OK, Json(user)))
}

/// Apply a partial update to username, email and/or password. Fields
/// left out of the body keep their stored values.
async fn update_user(
    State(state): State<UsersState>,
    SelfOrAdmin(_claims): SelfOrAdmin,
    Path(username): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = json_body(payload)?;

    let new_username = str_field(&body, "username");
    let new_email = str_field(&body, "email");
    let new_password = str_field(&body, "password");

    if new_username.is_none() && new_email.is_none() && new_password.is_none() {
        return Err(ApiError::bad_request("No data"));
    }

    if let Some(name) = new_username {
        validate_username(name)?;
    }
    if let Some(email) = new_email {
        validate_email(email)?;
    }
    if let Some(password) = new_password {
        validate_password(password)?;
    }

    let current = state
        .db
        .users()
        .get_by_username(&username)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found(format!("Unable to find user: {username}")))?;

    if let Some(name) = new_username {
        if name != current.username
            && state
                .db
                .users()
                .username_taken(name)
                .await
                .db_err("Failed to check username")?
        {
            return Err(ApiError::bad_request(format!(
                "Username '{name}' is already taken."
            )));
        }
    }
    if let Some(email) = new_email {
        if email != current.email
            && state
                .db
                .users()
                .email_taken(email)
                .await
                .db_err("Failed to check email")?
        {
            return Err(ApiError::bad_request(format!(
                "Email '{email}' is already taken."
            )));
        }
    }

    let password_hash = match new_password {
        Some(password) => Some(
            hash_password(password)
                .map_err(|e| ApiError::internal("Failed to hash password", e))?,
        ),
        None => None,
    };

    let updated = state
        .db
        .users()
        .update(&username, new_username, new_email, password_hash.as_deref())
        .await
        .db_err("Failed to update user")?
        .ok_or_else(|| ApiError::not_found(format!("Unable to find user: {username}")))?;

    Ok((StatusCode::OK, Json(PublicUser::from(updated))))
}

/// Remove an account. The foreign key cascade drops the user's refresh
/// tokens with the row, so their sessions die too.
async fn delete_user(
    State(state): State<UsersState>,
    SelfOrAdmin(_claims): SelfOrAdmin,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .users()
        .delete(&username)
        .await
        .db_err("Failed to delete user")?;

    if !deleted {
        return Err(ApiError::not_found(format!(
            "Unable to find user: {username}"
        )));
    }

    Ok((StatusCode::OK, Json(json!({ "message": "User deleted" }))))
}
