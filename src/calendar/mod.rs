/// External calendar boundary
///
/// Everything the sync service needs from a calendar provider goes through the
/// [`CalendarApi`] trait. [`GoogleCalendarClient`] talks to the Google Calendar
/// v3 REST API; `InMemoryCalendar` is a deterministic stand-in used by tests.

mod types;
pub use types::*;

mod google;
pub use google::{GoogleCalendarClient, GoogleOAuthSettings};

#[cfg(any(test, feature = "test"))]
mod memory;
#[cfg(any(test, feature = "test"))]
pub use memory::{InMemoryCalendar, RecordedCall};

use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by a calendar provider
#[derive(Error, Debug)]
pub enum CalendarError {
    /// The sync token is no longer valid and a full sync is required (HTTP 410)
    #[error("sync token expired")]
    SyncTokenExpired,
    /// The access token was rejected or the grant was revoked
    #[error("calendar authorization was rejected")]
    Unauthorized,
    #[error("calendar resource not found")]
    NotFound,
    #[error("calendar rate limit exceeded")]
    RateLimited,
    #[error("calendar API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("calendar request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected calendar response: {0}")]
    Decode(String),
}

/// Operations the sync service needs from a calendar provider
///
/// Every call that touches a user's calendar takes the user's current access
/// token; token storage and refresh are the caller's concern.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    /// URL the user is sent to in order to grant calendar access
    fn authorization_url(&self, state: &str) -> String;

    /// Trades an authorization code for tokens
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, CalendarError>;

    /// Obtains a fresh access token
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenGrant, CalendarError>;

    /// Lists one page of events
    async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        query: &EventQuery,
    ) -> Result<EventPage, CalendarError>;

    async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &EventWrite,
    ) -> Result<RemoteEvent, CalendarError>;

    async fn patch_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        event: &EventWrite,
    ) -> Result<RemoteEvent, CalendarError>;

    /// Deletes an event; an event that is already gone is not an error
    async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<(), CalendarError>;

    /// Subscribes to push notifications for changes to a calendar's events
    async fn watch_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        request: &WatchRequest,
    ) -> Result<WatchResponse, CalendarError>;

    /// Cancels a push-notification subscription
    async fn stop_channel(
        &self,
        access_token: &str,
        channel_id: &str,
        resource_id: &str,
    ) -> Result<(), CalendarError>;
}
