/// ShootDesk: content-production scheduling with Google Calendar sync
///
/// This library provides the core of the ShootDesk server: clients, shoots
/// and the post ideas planned around them, plus two-way synchronization of
/// shoots with each user's Google Calendar.
///
/// ### Modules
///
/// - `auth`: Request identity and role checks
/// - `calendar`: The calendar provider boundary and the Google client
/// - `config`: Layered configuration (defaults, file, environment, flags)
/// - `db`: Database connection management and migrations
/// - `dto`: Request bodies and query strings
/// - `errors`: The API error type and its HTTP mapping
/// - `handlers`: HTTP handlers
/// - `models`: Data structures stored in the database
/// - `repo`: Repository layer for database operations
/// - `schema`: Database schema definitions
/// - `sync`: Calendar reconciliation, push channels and conflict detection
///
/// ### Web API
///
/// - `GET /health`: Liveness check
/// - `POST /clients`, `GET /clients`, `GET|PATCH|DELETE /clients/{id}`
/// - `POST /shoots`, `GET /shoots`, `GET|PATCH|DELETE /shoots/{id}`
/// - `POST /shoots/{id}/post_ideas`, `GET /shoots/{id}/post_ideas`
/// - `GET|PATCH|DELETE /post_ideas/{id}`
/// - `GET /integrations`, `GET /integrations/google/authorize`,
///   `GET /integrations/google/callback`, `DELETE /integrations/google`
/// - `POST|GET /calendar/sync`, `GET /calendar/events`,
///   `POST /calendar/watch`, `GET /calendar/conflicts`
/// - `POST /webhooks/google-calendar`: Google push notifications

pub mod auth;
pub mod calendar;
pub mod config;
pub mod db;
pub mod dto;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod repo;
pub mod schema;
pub mod sync;

use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use db::run_migrations;
use handlers::*;
use sync::GoogleCalendarSync;

/// State shared by every handler
///
/// Handlers extract only the part they need through `State<Arc<DbPool>>`
/// or `State<GoogleCalendarSync>`.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<db::DbPool>,
    pub sync: GoogleCalendarSync,
}

impl FromRef<AppState> for Arc<db::DbPool> {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for GoogleCalendarSync {
    fn from_ref(state: &AppState) -> Self {
        state.sync.clone()
    }
}

/// Creates the application router with all routes
///
/// ### Arguments
///
/// * `state` - The database pool and calendar sync service shared with all handlers
///
/// ### Returns
///
/// An Axum Router configured with all routes, request tracing and CORS
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        // Clients
        .route("/clients", post(create_client_handler).get(list_clients_handler))
        .route(
            "/clients/{id}",
            get(get_client_handler).patch(update_client_handler).delete(delete_client_handler),
        )
        // Shoots and their post ideas
        .route("/shoots", post(create_shoot_handler).get(list_shoots_handler))
        .route(
            "/shoots/{id}",
            get(get_shoot_handler).patch(update_shoot_handler).delete(delete_shoot_handler),
        )
        .route(
            "/shoots/{id}/post_ideas",
            post(create_post_idea_handler).get(list_post_ideas_handler),
        )
        .route(
            "/post_ideas/{id}",
            get(get_post_idea_handler).patch(update_post_idea_handler).delete(delete_post_idea_handler),
        )
        // Google Calendar connection
        .route("/integrations", get(list_integrations_handler))
        .route("/integrations/google", axum::routing::delete(google_disconnect_handler))
        .route("/integrations/google/authorize", get(google_authorize_handler))
        .route("/integrations/google/callback", get(google_callback_handler))
        // Sync, cached events and conflicts
        .route("/calendar/sync", post(trigger_sync_handler).get(sync_status_handler))
        .route("/calendar/events", get(list_calendar_events_handler))
        .route("/calendar/watch", post(start_watch_handler))
        .route("/calendar/conflicts", get(conflicts_handler))
        // Called by Google, not by users
        .route("/webhooks/google-calendar", post(google_calendar_webhook_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{Duration, Utc};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::auth::USER_ID_HEADER;
    use crate::calendar::InMemoryCalendar;
    use crate::db::DbPool;
    use crate::models::{Integration, IntegrationProvider, UserRole};
    use crate::sync::SyncSettings;

    pub use crate::repo::tests::{seed_user_and_client, setup_test_db};

    /// Sync settings used by handler tests: write-through on, webhook set
    pub fn test_settings() -> SyncSettings {
        SyncSettings {
            calendar_id: "primary".to_string(),
            past_days: 30,
            future_days: 180,
            push_on_write: true,
            webhook_url: Some("https://hooks.example.com/webhooks/google-calendar".to_string()),
            channel_ttl: Duration::hours(168),
        }
    }

    /// Builds app state over a fresh database and an in-memory calendar
    pub fn test_state() -> (AppState, Arc<InMemoryCalendar>) {
        let pool = setup_test_db();
        let calendar = Arc::new(InMemoryCalendar::new());
        let sync = GoogleCalendarSync::new(pool.clone(), calendar.clone(), test_settings());
        (AppState { pool, sync }, calendar)
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
                Some(Utc::now() + Duration::hours(1)),
                None,
                "primary".to_string(),
            ),
        )
        .unwrap();
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if body.is_empty() { Value::Null } else { serde_json::from_slice(&body).unwrap() };
        (status, json)
    }

    fn json_request(method: &str, uri: &str, user_id: &str, body: Value) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .method(method)
            .header(USER_ID_HEADER, user_id)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str, user_id: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .method("GET")
            .header(USER_ID_HEADER, user_id)
            .body(Body::empty())
            .unwrap()
    }

    /// Tests the health endpoint, which needs no identity
    #[tokio::test]
    async fn test_health() {
        let (state, _) = test_state();
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let (status, body) = send(create_app(state), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    /// Tests that user routes reject requests without `X-User-Id`
    #[tokio::test]
    async fn test_missing_identity_is_unauthorized() {
        let (state, _) = test_state();
        let request = Request::builder().uri("/clients").body(Body::empty()).unwrap();

        let (status, body) = send(create_app(state), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());
    }

    /// Tests that viewers can read but not write
    #[tokio::test]
    async fn test_viewer_cannot_create_client() {
        let (state, _) = test_state();
        let viewer = repo::create_user(&state.pool, "v@example.com".to_string(), "Viewer".to_string(), UserRole::Viewer)
            .unwrap();

        let (status, _) = send(
            create_app(state.clone()),
            json_request("POST", "/clients", &viewer.get_id(), serde_json::json!({ "name": "Nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(create_app(state), get_request("/clients", &viewer.get_id())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }

    /// Tests the client, shoot and post idea routes end to end
    #[tokio::test]
    async fn test_shoot_routes() {
        let (state, calendar) = test_state();
        let (user, client) = seed_user_and_client(&state.pool);
        connect_calendar(&state.pool, &user.get_id());
        let starts_at = Utc::now() + Duration::days(3);

        let (status, shoot) = send(
            create_app(state.clone()),
            json_request(
                "POST",
                "/shoots",
                &user.get_id(),
                serde_json::json!({
                    "client_id": client.get_id(),
                    "title": "Spring menu",
                    "starts_at": starts_at,
                    "ends_at": starts_at + Duration::hours(2),
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(shoot["status"], "scheduled");
        let event_id = shoot["google_event_id"].as_str().unwrap().to_string();
        assert!(calendar.event(&event_id).is_some());

        let shoot_id = shoot["id"].as_str().unwrap().to_string();
        let (status, idea) = send(
            create_app(state.clone()),
            json_request(
                "POST",
                &format!("/shoots/{}/post_ideas", shoot_id),
                &user.get_id(),
                serde_json::json!({ "title": "Plating close-ups" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(idea["shoot_id"], shoot_id.as_str());

        let (status, listed) = send(
            create_app(state.clone()),
            get_request("/shoots?statuses=scheduled&statuses=completed", &user.get_id()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, _) = send(
            create_app(state.clone()),
            json_request("PATCH", &format!("/shoots/{}", shoot_id), &user.get_id(), serde_json::json!({ "status": "cancelled" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(calendar.event(&event_id).unwrap().is_cancelled());
    }

    /// Tests that a half-open conflict query is rejected
    #[tokio::test]
    async fn test_conflicts_needs_both_bounds() {
        let (state, _) = test_state();
        let (user, _) = seed_user_and_client(&state.pool);

        let (status, _) = send(
            create_app(state),
            get_request("/calendar/conflicts?start=2030-01-01T10:00:00Z", &user.get_id()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    /// Tests that sync without a connected calendar is a 409
    #[tokio::test]
    async fn test_sync_without_calendar_conflicts() {
        let (state, _) = test_state();
        let (user, _) = seed_user_and_client(&state.pool);

        let request = Request::builder()
            .uri("/calendar/sync")
            .method("POST")
            .header(USER_ID_HEADER, user.get_id())
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(create_app(state), request).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    /// Tests that the webhook answers 200 without any identity
    #[tokio::test]
    async fn test_webhook_is_public() {
        let (state, _) = test_state();
        let request = Request::builder()
            .uri("/webhooks/google-calendar")
            .method("POST")
            .header("X-Goog-Channel-ID", "unknown")
            .header("X-Goog-Resource-State", "exists")
            .body(Body::empty())
            .unwrap();

        let (status, _) = send(create_app(state), request).await;
        assert_eq!(status, StatusCode::OK);
    }
}
