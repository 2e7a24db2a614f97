#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use eventspotter::db::Database;
use eventspotter::rate_limit::RateLimitConfig;
use eventspotter::{ServerConfig, create_app};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const ACCESS_SECRET: &[u8] = b"integration-test-access-secret-0123456789";
pub const REFRESH_SECRET: &[u8] = b"integration-test-refresh-secret-0123456789";
pub const ACCESS_TTL_SECS: u64 = 900;
pub const REFRESH_TTL_SECS: u64 = 3600;

pub struct TestApp {
    pub app: Router,
    pub db: Database,
}

/// App over a fresh in-memory database, rate limiting effectively off.
pub async fn setup() -> TestApp {
    setup_with_limits(RateLimitConfig::unlimited()).await
}

pub async fn setup_with_limits(rate_limits: RateLimitConfig) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = ServerConfig {
        db: db.clone(),
        access_secret: ACCESS_SECRET.to_vec(),
        refresh_secret: REFRESH_SECRET.to_vec(),
        access_ttl_secs: ACCESS_TTL_SECS,
        refresh_ttl_secs: REFRESH_TTL_SECS,
        rate_limits: Arc::new(rate_limits),
    };
    TestApp {
        app: create_app(&config),
        db,
    }
}

impl TestApp {
    pub async fn request(&self, request: Request<Body>) -> Response<Body> {
        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed")
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> Response<Body> {
        self.request(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// POST with no body; headers given as name/value pairs.
    pub async fn post_with_headers(&self, uri: &str, headers: &[(&str, &str)]) -> Response<Body> {
        let mut builder = Request::builder().method("POST").uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.request(builder.body(Body::empty()).unwrap()).await
    }

    /// Bodyless request carrying a bearer access token.
    pub async fn authed(&self, method: &str, uri: &str, token: &str) -> Response<Body> {
        self.request(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// JSON request carrying a bearer access token.
    pub async fn authed_json(
        &self,
        method: &str,
        uri: &str,
        token: &str,
        body: Value,
    ) -> Response<Body> {
        self.request(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("authorization", format!("Bearer {token}"))
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Register a user, asserting success. Returns the parsed 201 body
    /// ({newUser, accessToken, refreshToken}).
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: &str,
        is_admin: bool,
    ) -> Value {
        let response = self
            .post_json(
                "/auth/register",
                json!({
                    "username": username,
                    "password": password,
                    "email": email,
                    "isAdmin": is_admin,
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await
    }

    /// Log in, asserting success. Returns the parsed 200 body
    /// ({authUser, accessToken, refreshToken}).
    pub async fn login(&self, username: &str, password: &str) -> Value {
        let response = self
            .post_json(
                "/auth/login",
                json!({ "username": username, "password": password }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).expect("Response body is not JSON")
}

pub fn token_str<'a>(body: &'a Value, key: &str) -> &'a str {
    body[key].as_str().unwrap_or_else(|| panic!("no {key} in response"))
}

pub fn error_message(body: &Value) -> &str {
    body["error"]["message"]
        .as_str()
        .expect("no error.message in response")
}

/// Decode a JWT's payload segment without verifying the signature, for
/// asserting on claims.
pub fn decode_claims(token: &str) -> Value {
    let payload = token.split('.').nth(1).expect("not a JWT");
    let bytes = URL_SAFE_NO_PAD.decode(payload).expect("payload is not base64url");
    serde_json::from_slice(&bytes).expect("claims are not JSON")
}
