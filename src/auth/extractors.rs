//! Axum extractors enforcing the three authorization gates.
//!
//! All three gates work purely from the access token: a request with a
//! valid access token is authorized without touching storage. Revocation
//! only bites when the short-lived access token expires and the client
//! has to go through the refresh endpoint.

use axum::extract::{FromRequestParts, Path};
use axum::http::{header, request::Parts};

use super::state::HasTokenCodec;
use crate::api::ApiError;
use crate::jwt::AccessClaims;

/// Strips an optional `Bearer ` scheme prefix, case-insensitively.
fn strip_bearer(value: &str) -> &str {
    let value = value.trim();
    match value.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => value[7..].trim_start(),
        _ => value,
    }
}

/// Shared token check: a missing Authorization header and a header that
/// fails verification are reported as distinct 401s.
fn access_claims<S>(parts: &Parts, state: &S) -> Result<AccessClaims, ApiError>
where
    S: HasTokenCodec + Send + Sync,
{
    let header = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("No token provided."))?;

    let token = header
        .to_str()
        .map(strip_bearer)
        .map_err(|_| ApiError::unauthorized("Failed to verify token."))?;

    state
        .codec()
        .validate_access_token(token)
        .map_err(|_| ApiError::unauthorized("Failed to verify token."))
}

/// Gate for routes any authenticated user may call.
pub struct Auth(pub AccessClaims);

impl<S> FromRequestParts<S> for Auth
where
    S: HasTokenCodec + Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        access_claims(parts, state).map(Auth)
    }
}

/// Gate for admin-only routes.
pub struct AdminAuth(pub AccessClaims);

impl<S> FromRequestParts<S> for AdminAuth
where
    S: HasTokenCodec + Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(claims) = Auth::from_request_parts(parts, state).await?;
        if !claims.is_admin {
            return Err(ApiError::unauthorized(
                "You are not authorized as an admin.",
            ));
        }
        Ok(AdminAuth(claims))
    }
}

/// Gate for routes a user may call about themselves and an admin may
/// call about anyone. Ownership is judged against the `{username}` path
/// parameter.
pub struct SelfOrAdmin(pub AccessClaims);

impl<S> FromRequestParts<S> for SelfOrAdmin
where
    S: HasTokenCodec + Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(claims) = Auth::from_request_parts(parts, state).await?;
        if claims.is_admin {
            return Ok(SelfOrAdmin(claims));
        }

        let Path(username) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| {
                ApiError::unauthorized("You are not authorized to access this resource.")
            })?;
        if claims.username != username {
            return Err(ApiError::unauthorized(
                "You are not authorized to access this resource.",
            ));
        }
        Ok(SelfOrAdmin(claims))
    }
}
