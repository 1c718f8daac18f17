use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{instrument, debug, info, warn};

use crate::auth::{CurrentUser, RequireWriter};
use crate::db::DbPool;
use crate::dto::OAuthCallbackQuery;
use crate::errors::ApiError;
use crate::repo;
use crate::sync::GoogleCalendarSync;

/// Handler for starting the Google consent flow
///
/// This function handles GET requests to `/integrations/google/authorize`.
///
/// ### Returns
///
/// `{"url": ...}`, the consent page to send the user to
#[instrument(skip(sync, user), fields(user_id = %user.id()))]
pub async fn google_authorize_handler(
    State(sync): State<GoogleCalendarSync>,
    RequireWriter(user): RequireWriter,
) -> Result<Json<Value>, ApiError> {
    debug!("Building Google authorization URL");
    Ok(Json(json!({ "url": sync.authorization_url(&user.id()) })))
}

/// Handler for the OAuth redirect back from Google
///
/// This function handles GET requests to `/integrations/google/callback`.
/// It is reached by the user's browser straight from Google, so it carries
/// no `X-User-Id`; the user is identified by the `state` parameter set in
/// [`google_authorize_handler`].
///
/// ### Arguments
///
/// * `pool` - The database connection pool
/// * `sync` - The calendar sync service
/// * `query` - `code` and `state`, or `error` when access was denied
///
/// ### Returns
///
/// The connection status and the result of the first sync
#[instrument(skip(pool, sync, query))]
pub async fn google_callback_handler(
    State(pool): State<Arc<DbPool>>,
    State(sync): State<GoogleCalendarSync>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Result<Json<Value>, ApiError> {
    if let Some(error) = query.error {
        warn!("Google consent was not granted: {}", error);
        return Err(ApiError::Validation(format!("Google access was not granted: {}", error)));
    }
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::Validation("Missing authorization code".to_string()))?;
    let user_id = query
        .state
        .ok_or_else(|| ApiError::Validation("Missing OAuth state".to_string()))?;

    let user = repo::get_user(&pool, &user_id)?
        .ok_or_else(|| ApiError::Validation("Unknown OAuth state".to_string()))?;

    let outcome = sync.connect(&user.get_id(), &code).await?;
    info!(user_id = %user.get_id(), "Google Calendar connected");

    Ok(Json(json!({
        "integration": outcome.integration.status_json(),
        "watching": outcome.watching,
        "initial_sync": outcome.initial_sync,
    })))
}

/// Handler for listing the user's integrations, without tokens
///
/// This function handles GET requests to `/integrations`.
#[instrument(skip(pool, user), fields(user_id = %user.id()))]
pub async fn list_integrations_handler(
    State(pool): State<Arc<DbPool>>,
    user: CurrentUser,
) -> Result<Json<Vec<Value>>, ApiError> {
    let integrations = repo::list_integrations_for_user(&pool, &user.id())?;
    Ok(Json(integrations.iter().map(|i| i.status_json()).collect()))
}

/// Handler for disconnecting Google Calendar
///
/// This function handles DELETE requests to `/integrations/google`.
///
/// ### Returns
///
/// 204 when a connection was removed, 404 when there was none
#[instrument(skip(sync, user), fields(user_id = %user.id()))]
pub async fn google_disconnect_handler(
    State(sync): State<GoogleCalendarSync>,
    RequireWriter(user): RequireWriter,
) -> Result<StatusCode, ApiError> {
    info!("Disconnecting Google Calendar");

    if sync.disconnect(&user.id()).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{seed_user_and_client, test_state};

    fn callback(code: Option<&str>, state: Option<String>, error: Option<&str>) -> Query<OAuthCallbackQuery> {
        Query(OAuthCallbackQuery {
            code: code.map(str::to_string),
            state,
            error: error.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn test_authorize_url_carries_user_id() {
        let (state, _) = test_state();
        let (user, _) = seed_user_and_client(&state.pool);

        let body = google_authorize_handler(State(state.sync.clone()), RequireWriter(CurrentUser(user.clone())))
            .await
            .unwrap()
            .0;
        assert!(body["url"].as_str().unwrap().ends_with(&user.get_id()));
    }

    #[tokio::test]
    async fn test_callback_connects_and_lists_without_tokens() {
        let (state, _) = test_state();
        let (user, _) = seed_user_and_client(&state.pool);

        let body = google_callback_handler(
            State(state.pool.clone()),
            State(state.sync.clone()),
            callback(Some("abc"), Some(user.get_id()), None),
        )
        .await
        .unwrap()
        .0;
        assert_eq!(body["integration"]["provider"], "google_calendar");
        assert_eq!(body["initial_sync"]["mode"], "full");

        let listed = list_integrations_handler(State(state.pool.clone()), CurrentUser(user)).await.unwrap().0;
        assert_eq!(listed.len(), 1);
        assert!(listed[0].get("access_token").is_none());
    }

    #[tokio::test]
    async fn test_callback_rejects_denied_and_unknown_state() {
        let (state, _) = test_state();
        let (user, _) = seed_user_and_client(&state.pool);

        let denied = google_callback_handler(
            State(state.pool.clone()),
            State(state.sync.clone()),
            callback(None, Some(user.get_id()), Some("access_denied")),
        )
        .await;
        assert!(matches!(denied, Err(ApiError::Validation(_))));

        let unknown = google_callback_handler(
            State(state.pool.clone()),
            State(state.sync.clone()),
            callback(Some("abc"), Some("nobody".to_string()), None),
        )
        .await;
        assert!(matches!(unknown, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_disconnect() {
        let (state, _) = test_state();
        let (user, _) = seed_user_and_client(&state.pool);

        let missing = google_disconnect_handler(State(state.sync.clone()), RequireWriter(CurrentUser(user.clone()))).await;
        assert!(matches!(missing, Err(ApiError::NotFound)));

        state.sync.connect(&user.get_id(), "abc").await.unwrap();
        let status = google_disconnect_handler(State(state.sync.clone()), RequireWriter(CurrentUser(user)))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
