//! Session API endpoints.
//!
//! - POST `/register` - Create an account and start a session
//! - POST `/login` - Start a session from username and password
//! - POST `/refresh` - Exchange a refresh token for a new access token
//! - POST `/logout` - Revoke a refresh token

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderName, StatusCode, header};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};

use super::error::{ApiError, json_body, str_field};
use crate::auth::{AuthError, NewUser, SessionController, TokenPair};
use crate::db::Database;
use crate::rate_limit::{RateLimitConfig, throttle_login, throttle_register};
use crate::validate::{ValidationError, validate_email, validate_password, validate_username};

/// Response header carrying the refresh token after register and login;
/// refresh and logout read the token back from the same header.
pub const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";

#[derive(Clone)]
pub struct AuthState {
    pub sessions: SessionController<Database>,
    pub rate_limits: Arc<RateLimitConfig>,
}

pub fn router(state: AuthState) -> Router {
    let register_routes = Router::new()
        .route("/register", post(register))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limits.clone(),
            throttle_register,
        ));

    let login_routes = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limits.clone(),
            throttle_login,
        ));

    let session_routes = Router::new()
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .with_state(state);

    Router::new()
        .merge(register_routes)
        .merge(login_routes)
        .merge(session_routes)
}

/// Presence check for the required string fields of an operation,
/// reported together so the client learns everything in one round trip.
fn require_str_fields<'a, const N: usize>(
    body: &'a Value,
    operation: &str,
    keys: [&'static str; N],
) -> Result<[&'a str; N], ValidationError> {
    let mut missing = Vec::new();
    let values = keys.map(|key| {
        let value = str_field(body, key);
        if value.is_none() {
            missing.push(key);
        }
        value
    });
    if !missing.is_empty() {
        return Err(ValidationError::missing_fields(operation, &missing));
    }
    Ok(values.map(Option::unwrap_or_default))
}

/// `isAdmin` is optional and defaults to false, but when present it
/// must be a real boolean.
fn admin_flag(body: &Value) -> Result<bool, ApiError> {
    match body.get("isAdmin") {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(_) => Err(ApiError::bad_request(
            "Invalid value for isAdmin. Must be boolean true or false.",
        )),
    }
}

fn token_headers(tokens: &TokenPair) -> [(HeaderName, String); 2] {
    [
        (header::AUTHORIZATION, tokens.access_token.clone()),
        (
            HeaderName::from_static(REFRESH_TOKEN_HEADER),
            tokens.refresh_token.clone(),
        ),
    ]
}

fn header_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REFRESH_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Create an account and log it straight in.
async fn register(
    State(state): State<AuthState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = json_body(payload)?;
    let [username, password, email] =
        require_str_fields(&body, "registration", ["username", "password", "email"])?;

    validate_username(username)?;
    validate_password(password)?;
    validate_email(email)?;
    let is_admin = admin_flag(&body)?;

    let (user, tokens) = state
        .sessions
        .register(NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            is_admin,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        token_headers(&tokens),
        Json(json!({
            "newUser": user,
            "accessToken": tokens.access_token,
            "refreshToken": tokens.refresh_token,
        })),
    ))
}

/// Log in with username and password. Only presence is checked here;
/// the stored record is the arbiter of whether the pair is right.
async fn login(
    State(state): State<AuthState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = json_body(payload)?;
    let [username, password] = require_str_fields(&body, "login", ["username", "password"])?;

    let (user, tokens) = state.sessions.login(username, password).await?;

    Ok((
        StatusCode::OK,
        token_headers(&tokens),
        Json(json!({
            "authUser": user,
            "accessToken": tokens.access_token,
            "refreshToken": tokens.refresh_token,
        })),
    ))
}

/// Mint a new access token for a live refresh token, taken from the
/// request body or the `x-refresh-token` header.
async fn refresh(
    State(state): State<AuthState>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = json_body(payload)?;
    let token = str_field(&body, "refreshToken")
        .map(str::to_string)
        .or_else(|| header_token(&headers))
        .ok_or(AuthError::MissingRefreshToken)?;

    let access_token = state.sessions.refresh(&token).await?;

    Ok((
        StatusCode::OK,
        [(header::AUTHORIZATION, access_token.clone())],
        Json(json!({ "accessToken": access_token })),
    ))
}

/// Revoke the refresh token named by the `x-refresh-token` header.
/// Succeeds whether or not such a token was ever issued.
async fn logout(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = header_token(&headers);
    state.sessions.logout(token.as_deref()).await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "message": "User logged out successfully" })),
    ))
}
