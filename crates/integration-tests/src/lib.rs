//! Integration tests for Garagem.
//!
//! The full router (sessions, request IDs, error mapping) is driven with
//! `tower::ServiceExt::oneshot` against the in-memory record store, an
//! in-memory session store and a settable clock. No database is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p garagem-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `health` - Liveness, readiness, fallback and request IDs
//! - `auth` - Registration, login, logout, profile and passwords
//! - `lots` - Ownership, sharing and access rules
//! - `vehicles` - Entries, exits, parked list and plate suggestions
//! - `reports` - JSON, spreadsheet and PDF reports
//! - `analytics` - Dashboard views

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use garagem_server::clock::FixedClock;
use garagem_server::config::ServerConfig;
use garagem_server::db::MemoryRecordStore;
use garagem_server::middleware::session::SESSION_COOKIE_NAME;
use garagem_server::state::AppState;

/// Password used by [`TestApp::register`].
pub const PASSWORD: &str = "segredo1";

/// 12:00 local time (-03:00) on Wednesday 2024-07-10.
#[must_use]
pub fn default_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 10, 15, 0, 0).unwrap()
}

/// Configuration used by every test app.
#[must_use]
pub fn test_config() -> ServerConfig {
    ServerConfig {
        database_url: SecretString::from("postgres://unused/garagem"),
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        session_secret: SecretString::from(
            "q8Zt3LmN0vR7xK2pW5yB9cF4hJ6dG1sA-eU3iO8nT2mQ7zX5vC0bL4kP9jH6fD1r",
        ),
        utc_offset: FixedOffset::west_opt(3 * 3600).unwrap(),
        rate_limit: false,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// A buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    /// Body parsed as JSON (`Null` when empty or not JSON).
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    /// The `error` message of a JSON error body.
    #[must_use]
    pub fn error(&self) -> String {
        self.json()["error"].as_str().unwrap_or_default().to_string()
    }

    /// `name=value` of the session cookie set by this response, if any.
    #[must_use]
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .find(|pair| pair.starts_with(&format!("{SESSION_COOKIE_NAME}=")))
            .map(str::to_owned)
    }

    /// A header value as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    }
}

/// The application wired to in-memory stores and a fixed clock.
pub struct TestApp {
    router: Router,
    pub store: Arc<MemoryRecordStore>,
    pub clock: Arc<FixedClock>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// App whose clock reads [`default_now`].
    #[must_use]
    pub fn new() -> Self {
        Self::at(default_now())
    }

    /// App whose clock reads `now`.
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        let store = Arc::new(MemoryRecordStore::new());
        let clock = Arc::new(FixedClock::new(now));
        let state = AppState::new(test_config(), store.clone(), clock.clone());
        let router = garagem_server::build_router(state, MemoryStore::default()).unwrap();
        Self {
            router,
            store,
            clock,
        }
    }

    /// Send a request, optionally with a session cookie and a JSON body.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        session: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = session {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&value).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, session: &str) -> TestResponse {
        self.send(Method::GET, uri, Some(session), None).await
    }

    pub async fn post(&self, uri: &str, session: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(session), Some(body)).await
    }

    pub async fn put(&self, uri: &str, session: &str, body: Value) -> TestResponse {
        self.send(Method::PUT, uri, Some(session), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, session: &str) -> TestResponse {
        self.send(Method::DELETE, uri, Some(session), None).await
    }

    /// Register an account and return its session cookie.
    pub async fn register(&self, full_name: &str, email: &str) -> String {
        let response = self
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "full_name": full_name,
                    "email": email,
                    "password": PASSWORD,
                    "accepted_terms": true,
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.error());
        response.session_cookie().unwrap()
    }

    /// Create a lot and return its ID.
    pub async fn create_lot(&self, session: &str, name: &str) -> String {
        let response = self
            .post("/api/lots", session, json!({ "name": name }))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.error());
        response.json()["id"].as_str().unwrap().to_string()
    }

    /// Register an entry and return the vehicle ID.
    pub async fn enter(&self, session: &str, lot: &str, plate: &str, driver: &str) -> String {
        let response = self
            .post(
                &format!("/api/lots/{lot}/vehicles"),
                session,
                json!({ "plate": plate, "driver": driver }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.error());
        response.json()["id"].as_str().unwrap().to_string()
    }
}
