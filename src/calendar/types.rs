use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Status of an event on the remote calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteEventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}

impl RemoteEventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteEventStatus::Confirmed => "confirmed",
            RemoteEventStatus::Tentative => "tentative",
            RemoteEventStatus::Cancelled => "cancelled",
        }
    }

    /// Parses Google's status string; anything unknown is treated as confirmed
    pub fn from_google(status: Option<&str>) -> Self {
        match status {
            Some("cancelled") => RemoteEventStatus::Cancelled,
            Some("tentative") => RemoteEventStatus::Tentative,
            _ => RemoteEventStatus::Confirmed,
        }
    }
}

/// An event as read from the remote calendar
///
/// Cancelled events returned by incremental listings may carry nothing but
/// their id and status, so the time fields are optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEvent {
    pub id: String,
    pub status: RemoteEventStatus,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Whether the event uses whole dates rather than times
    pub all_day: bool,
    pub etag: Option<String>,
    /// Last modification time on the remote side
    pub updated: DateTime<Utc>,
    /// Shoot id stored in the event's private extended properties
    pub shoot_id: Option<String>,
}

impl RemoteEvent {
    pub fn is_cancelled(&self) -> bool {
        self.status == RemoteEventStatus::Cancelled
    }

    /// The event's time span, when it has one
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }
}

/// Fields written to the remote calendar for a shoot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventWrite {
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Stored as a private extended property so remote copies can be traced
    /// back to the shoot they mirror
    pub shoot_id: String,
}

/// Parameters for one page of an event listing
///
/// Either `sync_token` is set (incremental) or the time window is used
/// (full). The provider rejects a request with both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventQuery {
    pub sync_token: Option<String>,
    pub time_min: Option<DateTime<Utc>>,
    pub time_max: Option<DateTime<Utc>>,
    pub page_token: Option<String>,
}

impl EventQuery {
    pub fn incremental(sync_token: String) -> Self {
        Self { sync_token: Some(sync_token), ..Default::default() }
    }

    pub fn window(time_min: DateTime<Utc>, time_max: DateTime<Utc>) -> Self {
        Self { time_min: Some(time_min), time_max: Some(time_max), ..Default::default() }
    }

    /// The same query continued at `page_token`
    pub fn with_page(&self, page_token: Option<String>) -> Self {
        Self { page_token, ..self.clone() }
    }
}

/// One page of an event listing
///
/// `next_sync_token` is only present on the last page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPage {
    pub events: Vec<RemoteEvent>,
    pub next_page_token: Option<String>,
    pub next_sync_token: Option<String>,
}

/// Request to start a push-notification channel
#[derive(Debug, Clone, PartialEq)]
pub struct WatchRequest {
    pub channel_id: String,
    pub token: String,
    /// Public HTTPS URL of the webhook receiver
    pub address: String,
    pub ttl: Duration,
}

/// A channel the provider agreed to open
#[derive(Debug, Clone, PartialEq)]
pub struct WatchResponse {
    pub channel_id: String,
    pub resource_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Tokens obtained from an authorization code or a refresh
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub scope: Option<String>,
}
