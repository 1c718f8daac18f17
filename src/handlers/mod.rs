/// Web API Handlers
///
/// This module contains the handlers for the RESTful API endpoints.
/// Each handler extracts the caller and request data, calls the repository
/// or the calendar sync service, and returns JSON. Errors are returned as
/// `ApiError` and rendered by its `IntoResponse` impl.

mod client_handlers;
mod shoot_handlers;
mod post_idea_handlers;
mod integration_handlers;
mod calendar_handlers;
mod webhook_handlers;

// Re-export all handlers
pub use client_handlers::*;
pub use shoot_handlers::*;
pub use post_idea_handlers::*;
pub use integration_handlers::*;
pub use calendar_handlers::*;
pub use webhook_handlers::*;

use axum::Json;
use serde_json::{json, Value};

/// Liveness check for `/health`
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
