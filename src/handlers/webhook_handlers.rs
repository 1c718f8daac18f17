use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
};
use tracing::{instrument, debug, info, warn};

use crate::sync::{GoogleCalendarSync, Notification, NotificationOutcome};

pub const CHANNEL_ID_HEADER: &str = "x-goog-channel-id";
pub const CHANNEL_TOKEN_HEADER: &str = "x-goog-channel-token";
pub const RESOURCE_ID_HEADER: &str = "x-goog-resource-id";
pub const RESOURCE_STATE_HEADER: &str = "x-goog-resource-state";
pub const MESSAGE_NUMBER_HEADER: &str = "x-goog-message-number";

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Reads a notification out of Google's `X-Goog-*` headers
///
/// Returns `None` when the channel id is missing.
pub fn notification_from_headers(headers: &HeaderMap) -> Option<Notification> {
    Some(Notification {
        channel_id: header(headers, CHANNEL_ID_HEADER)?,
        token: header(headers, CHANNEL_TOKEN_HEADER),
        resource_id: header(headers, RESOURCE_ID_HEADER),
        resource_state: header(headers, RESOURCE_STATE_HEADER).unwrap_or_else(|| "exists".to_string()),
        message_number: header(headers, MESSAGE_NUMBER_HEADER).and_then(|n| n.parse().ok()),
    })
}

/// Handler for Google Calendar push notifications
///
/// This function handles POST requests to `/webhooks/google-calendar`. It
/// is called by Google, not by users, and always answers 200: any other
/// status makes Google retry with backoff, which would not help with an
/// unknown or stale channel.
#[instrument(skip(sync, headers))]
pub async fn google_calendar_webhook_handler(
    State(sync): State<GoogleCalendarSync>,
    headers: HeaderMap,
) -> StatusCode {
    let Some(notification) = notification_from_headers(&headers) else {
        warn!("Notification without a channel id ignored");
        return StatusCode::OK;
    };

    match sync.handle_notification(notification).await {
        NotificationOutcome::Synced(report) => {
            info!(fetched = report.fetched, noop = report.is_noop(), "Notification synced");
        }
        NotificationOutcome::Failed(error) => warn!("Notification sync failed: {}", error),
        outcome => debug!(?outcome, "Notification handled"),
    }

    StatusCode::OK
}
