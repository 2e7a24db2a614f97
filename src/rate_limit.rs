//! Rate limiting for the authentication endpoints.
//!
//! Token bucket with per-IP tracking to slow down credential stuffing
//! and signup spam. Only register and login are throttled.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};

use crate::api::ApiError;

/// Per-IP rate limiter keyed by client address string.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Rate limiting configuration for the auth endpoints.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Per-IP limiter for account creation (strict).
    pub register: Arc<IpLimiter>,
    /// Per-IP limiter for login attempts (roomier; people mistype).
    pub login: Arc<IpLimiter>,
}

impl RateLimitConfig {
    /// Production quotas: 3 registrations and 10 login attempts per IP
    /// per minute.
    pub fn new() -> Self {
        Self::with_quotas(3, 10)
    }

    /// Effectively unthrottled configuration.
    pub fn unlimited() -> Self {
        Self::with_quotas(u32::MAX, u32::MAX)
    }

    fn with_quotas(register_per_minute: u32, login_per_minute: u32) -> Self {
        Self {
            register: Arc::new(RateLimiter::keyed(Quota::per_minute(nonzero(
                register_per_minute,
            )))),
            login: Arc::new(RateLimiter::keyed(Quota::per_minute(nonzero(
                login_per_minute,
            )))),
        }
    }
}

fn nonzero(per_minute: u32) -> NonZeroU32 {
    NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN)
}

/// Client IP used as the limiter key: first hop of `x-forwarded-for`
/// when present (reverse proxy), otherwise the socket address.
fn client_ip(request: &Request) -> Option<String> {
    if let Some(forwarded) = request.headers().get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                let ip = first.trim();
                if !ip.is_empty() {
                    return Some(ip.to_string());
                }
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
}

/// Middleware for rate limiting account creation.
pub async fn throttle_register(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    throttle(
        &config.register,
        "Too many signup attempts. Please wait before trying again.",
        request,
        next,
    )
    .await
}

/// Middleware for rate limiting login attempts.
pub async fn throttle_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    throttle(
        &config.login,
        "Too many login attempts. Please wait before trying again.",
        request,
        next,
    )
    .await
}

async fn throttle(limiter: &IpLimiter, message: &str, request: Request, next: Next) -> Response {
    let Some(ip) = client_ip(&request) else {
        // No forwarded header and no socket info; nothing to key on.
        return next.run(request).await;
    };

    match limiter.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => ApiError::too_many_requests(message).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn forwarded_header_wins_and_takes_first_hop() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&request).as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn no_header_and_no_socket_yields_none() {
        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&request), None);
    }

    #[test]
    fn strict_quota_trips_on_the_extra_request() {
        let config = RateLimitConfig::with_quotas(2, 2);
        let ip = "198.51.100.7".to_string();
        assert!(config.register.check_key(&ip).is_ok());
        assert!(config.register.check_key(&ip).is_ok());
        assert!(config.register.check_key(&ip).is_err());
        // A different address is unaffected.
        assert!(config.register.check_key(&"198.51.100.8".to_string()).is_ok());
    }
}
