use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{
    CalendarApi, CalendarError, EventPage, EventQuery, EventWrite, RemoteEvent, RemoteEventStatus,
    TokenGrant, WatchRequest, WatchResponse,
};

const API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";
const PAGE_SIZE: &str = "250";
const SHOOT_ID_PROPERTY: &str = "shootId";

/// OAuth client registration used for the Google consent flow
#[derive(Debug, Clone)]
pub struct GoogleOAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Google Calendar v3 REST client
pub struct GoogleCalendarClient {
    http: Client,
    oauth: GoogleOAuthSettings,
    api_base: String,
    auth_url: String,
    token_url: String,
}

impl GoogleCalendarClient {
    pub fn new(oauth: GoogleOAuthSettings) -> Self {
        Self::with_endpoints(oauth, API_BASE, AUTH_URL, TOKEN_URL)
    }

    /// Creates a client against non-default endpoints
    pub fn with_endpoints(
        oauth: GoogleOAuthSettings,
        api_base: &str,
        auth_url: &str,
        token_url: &str,
    ) -> Self {
        Self {
            http: Client::new(),
            oauth,
            api_base: api_base.trim_end_matches('/').to_string(),
            auth_url: auth_url.to_string(),
            token_url: token_url.to_string(),
        }
    }

    /// Builds an API URL from path segments, percent-encoding each one
    ///
    /// Calendar ids are usually email addresses, so they cannot be pasted
    /// into the path verbatim.
    fn api_url(&self, segments: &[&str]) -> Result<Url, CalendarError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| CalendarError::Decode(format!("invalid API base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| CalendarError::Decode("API base URL cannot have a path".to_string()))?
            .extend(segments);
        Ok(url)
    }

    fn events_url(&self, calendar_id: &str, tail: &[&str]) -> Result<Url, CalendarError> {
        let mut segments = vec!["calendars", calendar_id, "events"];
        segments.extend_from_slice(tail);
        self.api_url(&segments)
    }

    async fn send_json<T: for<'de> Deserialize<'de>>(request: RequestBuilder) -> Result<T, CalendarError> {
        let response = check(request.send().await?).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| CalendarError::Decode(e.to_string()))
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenGrant, CalendarError> {
        let request = self.http.post(&self.token_url).form(form);
        let body: GoogleTokenResponse = Self::send_json(request).await?;
        Ok(body.into_grant(Utc::now()))
    }
}

#[async_trait]
impl CalendarApi for GoogleCalendarClient {
    fn authorization_url(&self, state: &str) -> String {
        let params = [
            ("client_id", self.oauth.client_id.as_str()),
            ("redirect_uri", self.oauth.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", CALENDAR_SCOPE),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("include_granted_scopes", "true"),
            ("state", state),
        ];
        match Url::parse_with_params(&self.auth_url, &params) {
            Ok(url) => url.to_string(),
            Err(e) => {
                warn!("Invalid authorization URL {}: {}", self.auth_url, e);
                self.auth_url.clone()
            }
        }
    }

    #[instrument(skip_all)]
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, CalendarError> {
        debug!("Exchanging authorization code");
        self.token_request(&[
            ("code", code),
            ("client_id", &self.oauth.client_id),
            ("client_secret", &self.oauth.client_secret),
            ("redirect_uri", &self.oauth.redirect_uri),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    #[instrument(skip_all)]
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenGrant, CalendarError> {
        debug!("Refreshing access token");
        self.token_request(&[
            ("refresh_token", refresh_token),
            ("client_id", &self.oauth.client_id),
            ("client_secret", &self.oauth.client_secret),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    #[instrument(skip(self, access_token, query), fields(incremental = query.sync_token.is_some()))]
    async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        query: &EventQuery,
    ) -> Result<EventPage, CalendarError> {
        let mut params: Vec<(&str, String)> = vec![
            ("singleEvents", "true".to_string()),
            ("showDeleted", "true".to_string()),
            ("maxResults", PAGE_SIZE.to_string()),
        ];
        if let Some(sync_token) = &query.sync_token {
            params.push(("syncToken", sync_token.clone()));
        } else {
            if let Some(time_min) = query.time_min {
                params.push(("timeMin", time_min.to_rfc3339()));
            }
            if let Some(time_max) = query.time_max {
                params.push(("timeMax", time_max.to_rfc3339()));
            }
        }
        if let Some(page_token) = &query.page_token {
            params.push(("pageToken", page_token.clone()));
        }

        let request = self
            .http
            .get(self.events_url(calendar_id, &[])?)
            .bearer_auth(access_token)
            .query(&params);
        let body: GoogleEventList = Self::send_json(request).await?;

        let mut events = Vec::with_capacity(body.items.len());
        for item in body.items {
            match item.into_remote() {
                Ok(event) => events.push(event),
                // One malformed event should not block the rest of the calendar
                Err(e) => warn!("Skipping undecodable event: {}", e),
            }
        }
        debug!("Listed {} events", events.len());

        Ok(EventPage {
            events,
            next_page_token: body.next_page_token,
            next_sync_token: body.next_sync_token,
        })
    }

    #[instrument(skip(self, access_token, event), fields(shoot_id = %event.shoot_id))]
    async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &EventWrite,
    ) -> Result<RemoteEvent, CalendarError> {
        let request = self
            .http
            .post(self.events_url(calendar_id, &[])?)
            .bearer_auth(access_token)
            .json(&GoogleEventBody::from(event));
        let created: GoogleEvent = Self::send_json(request).await?;
        created.into_remote()
    }

    #[instrument(skip(self, access_token, event), fields(shoot_id = %event.shoot_id))]
    async fn patch_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        event: &EventWrite,
    ) -> Result<RemoteEvent, CalendarError> {
        let request = self
            .http
            .patch(self.events_url(calendar_id, &[event_id])?)
            .bearer_auth(access_token)
            .json(&GoogleEventBody::from(event));
        let updated: GoogleEvent = Self::send_json(request).await?;
        updated.into_remote()
    }

    #[instrument(skip(self, access_token))]
    async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<(), CalendarError> {
        let response = self
            .http
            .delete(self.events_url(calendar_id, &[event_id])?)
            .bearer_auth(access_token)
            .send()
            .await?;
        match check(response).await {
            Ok(_) => Ok(()),
            // Already deleted on the remote side
            Err(CalendarError::NotFound) | Err(CalendarError::SyncTokenExpired) => Ok(()),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, access_token, request), fields(channel_id = %request.channel_id))]
    async fn watch_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        request: &WatchRequest,
    ) -> Result<WatchResponse, CalendarError> {
        let body = serde_json::json!({
            "id": request.channel_id,
            "type": "web_hook",
            "address": request.address,
            "token": request.token,
            "params": { "ttl": request.ttl.num_seconds().to_string() },
        });
        let http_request = self
            .http
            .post(self.events_url(calendar_id, &["watch"])?)
            .bearer_auth(access_token)
            .json(&body);
        let channel: GoogleChannel = Self::send_json(http_request).await?;

        let expires_at = channel
            .expiration
            .as_deref()
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_else(|| Utc::now() + request.ttl);

        Ok(WatchResponse {
            channel_id: channel.id,
            resource_id: channel.resource_id,
            expires_at,
        })
    }

    #[instrument(skip(self, access_token))]
    async fn stop_channel(
        &self,
        access_token: &str,
        channel_id: &str,
        resource_id: &str,
    ) -> Result<(), CalendarError> {
        let response = self
            .http
            .post(self.api_url(&["channels", "stop"])?)
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "id": channel_id, "resourceId": resource_id }))
            .send()
            .await?;
        match check(response).await {
            Ok(_) | Err(CalendarError::NotFound) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Maps a non-success response to a [`CalendarError`]
async fn check(response: Response) -> Result<Response, CalendarError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let parsed: Option<GoogleErrorEnvelope> = serde_json::from_str(&body).ok();
    let reason = parsed
        .as_ref()
        .and_then(|e| e.error.errors.first())
        .and_then(|d| d.reason.clone())
        .unwrap_or_default();
    let message = parsed
        .map(|e| e.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("HTTP {}", status));

    Err(error_for_status(status, &reason, message))
}

fn error_for_status(status: StatusCode, reason: &str, message: String) -> CalendarError {
    match status {
        StatusCode::GONE => CalendarError::SyncTokenExpired,
        StatusCode::UNAUTHORIZED => CalendarError::Unauthorized,
        StatusCode::NOT_FOUND => CalendarError::NotFound,
        StatusCode::TOO_MANY_REQUESTS => CalendarError::RateLimited,
        StatusCode::FORBIDDEN if reason.contains("RateLimitExceeded") || reason == "rateLimitExceeded" => {
            CalendarError::RateLimited
        }
        // Token endpoint answers 400 invalid_grant for revoked refresh tokens
        StatusCode::BAD_REQUEST if message.contains("invalid_grant") => CalendarError::Unauthorized,
        _ => CalendarError::Api { status: status.as_u16(), message },
    }
}

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<GoogleErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
}

impl GoogleTokenResponse {
    fn into_grant(self, now: DateTime<Utc>) -> TokenGrant {
        TokenGrant {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self.expires_in.map(|secs| now + Duration::seconds(secs)),
            scope: self.scope,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventList {
    #[serde(default)]
    items: Vec<GoogleEvent>,
    next_page_token: Option<String>,
    next_sync_token: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
}

impl GoogleEventTime {
    /// Returns the instant and whether it came from a whole date
    fn parse(&self) -> Result<Option<(DateTime<Utc>, bool)>, CalendarError> {
        if let Some(date_time) = &self.date_time {
            let parsed = DateTime::parse_from_rfc3339(date_time)
                .map_err(|e| CalendarError::Decode(format!("invalid dateTime {}: {}", date_time, e)))?;
            return Ok(Some((parsed.with_timezone(&Utc), false)));
        }
        if let Some(date) = &self.date {
            let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|e| CalendarError::Decode(format!("invalid date {}: {}", date, e)))?;
            let midnight = parsed
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| CalendarError::Decode(format!("invalid date {}", date)))?;
            return Ok(Some((midnight.and_utc(), true)));
        }
        Ok(None)
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct GoogleExtendedProperties {
    #[serde(default, rename = "private")]
    private_props: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEvent {
    id: String,
    status: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: Option<GoogleEventTime>,
    end: Option<GoogleEventTime>,
    etag: Option<String>,
    updated: Option<String>,
    extended_properties: Option<GoogleExtendedProperties>,
}

impl GoogleEvent {
    fn into_remote(self) -> Result<RemoteEvent, CalendarError> {
        let start = self.start.as_ref().map(GoogleEventTime::parse).transpose()?.flatten();
        let end = self.end.as_ref().map(GoogleEventTime::parse).transpose()?.flatten();
        let updated = match &self.updated {
            Some(updated) => DateTime::parse_from_rfc3339(updated)
                .map_err(|e| CalendarError::Decode(format!("invalid updated {}: {}", updated, e)))?
                .with_timezone(&Utc),
            None => Utc::now(),
        };
        let shoot_id = self
            .extended_properties
            .and_then(|mut props| props.private_props.remove(SHOOT_ID_PROPERTY));

        Ok(RemoteEvent {
            id: self.id,
            status: RemoteEventStatus::from_google(self.status.as_deref()),
            summary: self.summary.unwrap_or_else(|| "(No title)".to_string()),
            description: self.description,
            location: self.location,
            all_day: start.is_some_and(|(_, all_day)| all_day),
            start: start.map(|(at, _)| at),
            end: end.map(|(at, _)| at),
            etag: self.etag,
            updated,
            shoot_id,
        })
    }
}

/// Request body for inserting or patching an event
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventBody {
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    start: GoogleEventTime,
    end: GoogleEventTime,
    extended_properties: GoogleExtendedProperties,
}

impl From<&EventWrite> for GoogleEventBody {
    fn from(event: &EventWrite) -> Self {
        let mut private_props = HashMap::new();
        private_props.insert(SHOOT_ID_PROPERTY.to_string(), event.shoot_id.clone());
        Self {
            summary: event.summary.clone(),
            description: event.description.clone(),
            location: event.location.clone(),
            start: GoogleEventTime { date_time: Some(event.start.to_rfc3339()), date: None },
            end: GoogleEventTime { date_time: Some(event.end.to_rfc3339()), date: None },
            extended_properties: GoogleExtendedProperties { private_props },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleChannel {
    id: String,
    resource_id: String,
    /// Milliseconds since the epoch, as a string
    expiration: Option<String>,
}
