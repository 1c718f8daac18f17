//! Common test utilities for ShootDesk integration tests
//!
//! This file contains shared functions for all integration tests: building
//! the application over a fresh database, seeding users, and helpers that
//! create clients and shoots through the HTTP API.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use shootdesk::{
    auth::USER_ID_HEADER,
    calendar::{CalendarApi, GoogleCalendarClient, GoogleOAuthSettings},
    create_app,
    db::{self, DbPool},
    models::{Client, Integration, IntegrationProvider, Shoot, User, UserRole},
    repo,
    sync::{GoogleCalendarSync, SyncSettings},
    AppState,
};
use std::sync::Arc;
use tower::Service;

#[cfg(feature = "test")]
pub use shootdesk::calendar::InMemoryCalendar;

pub const WEBHOOK_URL: &str = "https://hooks.example.com/webhooks/google-calendar";

/// A running test application and direct access to its database
pub struct TestApp {
    pub app: Router,
    pub pool: Arc<DbPool>,
    pub sync: GoogleCalendarSync,
}

/// Creates a fresh in-memory SQLite database with migrations applied
///
/// Every call gets its own uniquely named shared-cache database so all
/// pooled connections see the same data and tests stay isolated.
pub fn create_test_pool() -> Arc<DbPool> {
    let database_url = format!("file:it_{}?mode=memory&cache=shared", uuid::Uuid::new_v4());
    let pool = db::init_pool(&database_url).unwrap();
    let mut conn = pool.get().unwrap();
    shootdesk::run_migrations(&mut conn).unwrap();
    drop(conn);
    Arc::new(pool)
}

pub fn test_settings() -> SyncSettings {
    SyncSettings {
        calendar_id: "primary".to_string(),
        past_days: 30,
        future_days: 180,
        push_on_write: true,
        webhook_url: Some(WEBHOOK_URL.to_string()),
        channel_ttl: chrono::Duration::hours(168),
    }
}

fn build(pool: Arc<DbPool>, api: Arc<dyn CalendarApi>) -> TestApp {
    let sync = GoogleCalendarSync::new(pool.clone(), api, test_settings());
    let app = create_app(AppState { pool: pool.clone(), sync: sync.clone() });
    TestApp { app, pool, sync }
}

/// Creates a test application whose calendar client points nowhere
///
/// Suitable for tests that never connect a calendar; nothing is pushed
/// for users without an integration.
pub fn create_test_app() -> TestApp {
    let google = GoogleCalendarClient::with_endpoints(
        GoogleOAuthSettings {
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
            redirect_uri: "http://localhost/integrations/google/callback".to_string(),
        },
        "http://127.0.0.1:9/calendar/v3",
        "http://127.0.0.1:9/auth",
        "http://127.0.0.1:9/token",
    );
    build(create_test_pool(), Arc::new(google))
}

/// Creates a test application backed by an in-memory calendar
#[cfg(feature = "test")]
pub fn create_test_app_with_calendar() -> (TestApp, Arc<InMemoryCalendar>) {
    let calendar = Arc::new(InMemoryCalendar::new());
    (build(create_test_pool(), calendar.clone()), calendar)
}

/// Inserts a user with the given role directly into the database
pub fn create_user(pool: &DbPool, role: UserRole) -> User {
    repo::create_user(
        pool,
        format!("{}@example.com", uuid::Uuid::new_v4()),
        format!("Test {}", role),
        role,
    )
    .unwrap()
}

/// Stores a Google Calendar integration with a valid access token
pub fn connect_calendar(pool: &DbPool, user_id: &str) {
    repo::upsert_integration(
        pool,
        Integration::new(
            user_id.to_string(),
            IntegrationProvider::GoogleCalendar,
            "access".to_string(),
            Some("refresh".to_string()),
            Some(Utc::now() + chrono::Duration::hours(1)),
            None,
            "primary".to_string(),
        ),
    )
    .unwrap();
}

/// Sends a request and returns the status and parsed JSON body
///
/// ### Arguments
///
/// * `app` - The test application
/// * `method` - HTTP method
/// * `uri` - Path and query
/// * `user_id` - Sent as `X-User-Id` when given
/// * `body` - JSON body, if any
///
/// ### Returns
///
/// The response status and body; an empty body comes back as `Value::Null`
pub async fn send(
    app: &mut Router,
    method: &str,
    uri: &str,
    user_id: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().uri(uri).method(method);
    if let Some(id) = user_id {
        builder = builder.header(USER_ID_HEADER, id);
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.call(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

/// Creates a client via the API
pub async fn create_client(app: &mut Router, user_id: &str, name: &str) -> Client {
    let (status, body) = send(app, "POST", "/clients", Some(user_id), Some(json!({ "name": name }))).await;
    assert_eq!(status, StatusCode::OK, "create client failed: {}", body);
    serde_json::from_value(body).unwrap()
}

/// Creates a shoot via the API
pub async fn create_shoot(
    app: &mut Router,
    user_id: &str,
    client_id: &str,
    title: &str,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
) -> Shoot {
    let (status, body) = send(
        app,
        "POST",
        "/shoots",
        Some(user_id),
        Some(json!({
            "client_id": client_id,
            "title": title,
            "starts_at": starts_at,
            "ends_at": ends_at,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create shoot failed: {}", body);
    serde_json::from_value(body).unwrap()
}
