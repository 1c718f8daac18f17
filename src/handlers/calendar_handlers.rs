use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{instrument, debug, info};

use crate::auth::{CurrentUser, RequireWriter};
use crate::db::DbPool;
use crate::dto::{ConflictQuery, SyncRequestDto, WindowQuery};
use crate::errors::ApiError;
use crate::models::{CalendarEvent, IntegrationProvider, WebhookChannel};
use crate::repo;
use crate::sync::{GoogleCalendarSync, SyncMode, SyncReport};

/// Handler for running a calendar sync on demand
///
/// This function handles POST requests to `/calendar/sync`. The body is
/// optional; `{"full": true}` ignores the stored sync token.
///
/// ### Returns
///
/// The sync report
///
/// ### Errors
///
/// 409 when Google Calendar is not connected
#[instrument(skip(sync, user, payload), fields(user_id = %user.id()))]
pub async fn trigger_sync_handler(
    State(sync): State<GoogleCalendarSync>,
    RequireWriter(user): RequireWriter,
    payload: Option<Json<SyncRequestDto>>,
) -> Result<Json<SyncReport>, ApiError> {
    let request = payload.map(|Json(p)| p).unwrap_or_default();
    let mode = if request.full { SyncMode::Full } else { SyncMode::Incremental };
    info!(?mode, "Sync requested");

    let report = sync.sync_user(&user.id(), mode).await?;
    Ok(Json(report))
}

/// Handler for the user's sync status
///
/// This function handles GET requests to `/calendar/sync`.
///
/// ### Returns
///
/// Whether a calendar is connected, the last run's bookkeeping and the
/// open push channels
#[instrument(skip(pool, user), fields(user_id = %user.id()))]
pub async fn sync_status_handler(
    State(pool): State<Arc<DbPool>>,
    user: CurrentUser,
) -> Result<Json<Value>, ApiError> {
    let integration = repo::get_integration(&pool, &user.id(), IntegrationProvider::GoogleCalendar)?;
    let state = repo::get_sync_state(&pool, &user.id())?;
    let channels: Vec<WebhookChannel> = repo::list_channels_for_user(&pool, &user.id())?;

    Ok(Json(json!({
        "connected": integration.is_some(),
        "calendar_id": integration.map(|i| i.get_calendar_id()),
        "has_sync_token": state.as_ref().is_some_and(|s| s.has_sync_token()),
        "state": state,
        "channels": channels,
    })))
}

/// Handler for listing cached calendar events
///
/// This function handles GET requests to `/calendar/events`. Missing bounds
/// default to the sync window.
#[instrument(skip(pool, sync, user, query), fields(user_id = %user.id()))]
pub async fn list_calendar_events_handler(
    State(pool): State<Arc<DbPool>>,
    State(sync): State<GoogleCalendarSync>,
    user: CurrentUser,
    Query(query): Query<WindowQuery>,
) -> Result<Json<Vec<CalendarEvent>>, ApiError> {
    let (default_start, default_end) = sync.settings().window(Utc::now());
    let start = query.start.unwrap_or(default_start);
    let end = query.end.unwrap_or(default_end);
    if start >= end {
        return Err(ApiError::Validation("start must be before end".to_string()));
    }

    let events = repo::list_calendar_events_in_window(&pool, &user.id(), start, end)?;
    debug!("Retrieved {} cached events", events.len());
    Ok(Json(events))
}

/// Handler for opening a push notification channel
///
/// This function handles POST requests to `/calendar/watch`. Any channel the
/// user already had is stopped once the new one is open.
#[instrument(skip(sync, user), fields(user_id = %user.id()))]
pub async fn start_watch_handler(
    State(sync): State<GoogleCalendarSync>,
    RequireWriter(user): RequireWriter,
) -> Result<Json<WebhookChannel>, ApiError> {
    let channel = sync.start_watch(&user.id()).await?;
    info!(channel_id = %channel.get_id(), "Watching calendar");
    Ok(Json(channel))
}

/// Handler for conflict detection
///
/// This function handles GET requests to `/calendar/conflicts`.
///
/// ### Arguments
///
/// * `query` - Either both `start` and `end` of a proposed slot (and
///   optionally `exclude_shoot_id`), or neither
///
/// ### Returns
///
/// `{"bookings": [...]}` overlapping the proposed slot, or
/// `{"conflicts": [...]}` across the sync window when no slot is given
#[instrument(skip(sync, user, query), fields(user_id = %user.id()))]
pub async fn conflicts_handler(
    State(sync): State<GoogleCalendarSync>,
    user: CurrentUser,
    Query(query): Query<ConflictQuery>,
) -> Result<Json<Value>, ApiError> {
    match (query.start, query.end) {
        (Some(start), Some(end)) => {
            if start >= end {
                return Err(ApiError::Validation("start must be before end".to_string()));
            }
            let bookings = sync.bookings_overlapping(&user.id(), start, end, query.exclude_shoot_id.as_deref())?;
            debug!("{} bookings overlap the proposed slot", bookings.len());
            Ok(Json(json!({ "bookings": bookings })))
        }
        (None, None) => {
            let (start, end) = sync.settings().window(Utc::now());
            let conflicts = sync.conflicts_in(&user.id(), start, end)?;
            debug!("{} conflicts in the sync window", conflicts.len());
            Ok(Json(json!({ "conflicts": conflicts })))
        }
        _ => Err(ApiError::Validation("start and end must be given together".to_string())),
    }
}
