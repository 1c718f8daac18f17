use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{
    CalendarApi, CalendarError, EventPage, EventQuery, EventWrite, RemoteEvent, RemoteEventStatus,
    TokenGrant, WatchRequest, WatchResponse,
};

/// A call made against the in-memory calendar, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    ExchangeCode,
    RefreshToken,
    List { incremental: bool },
    Insert { shoot_id: String },
    Patch { event_id: String },
    Delete { event_id: String },
    Watch { channel_id: String },
    Stop { channel_id: String },
}

#[derive(Debug, Clone)]
struct StoredEvent {
    event: RemoteEvent,
    /// Change sequence number, compared against sync tokens
    seq: u64,
}

#[derive(Debug)]
struct State {
    events: BTreeMap<String, StoredEvent>,
    seq: u64,
    /// Sync tokens issued before this sequence number are rejected
    token_floor: u64,
    next_id: u64,
    clock: DateTime<Utc>,
    page_size: usize,
    fail_writes: bool,
    revoked: bool,
    channels: BTreeMap<String, String>,
    calls: Vec<RecordedCall>,
}

/// Deterministic in-process calendar used in tests
///
/// It behaves like the Google API where the sync service depends on it.
/// Sync tokens only return changes made after they were issued, cancelled
/// events stay visible as tombstones, and deleting a missing event succeeds.
/// Helper methods simulate edits made by someone on the remote side.
#[derive(Debug)]
pub struct InMemoryCalendar {
    state: Mutex<State>,
}

impl Default for InMemoryCalendar {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                events: BTreeMap::new(),
                seq: 0,
                token_floor: 0,
                next_id: 0,
                clock: Utc::now(),
                page_size: 100,
                fail_writes: false,
                revoked: false,
                channels: BTreeMap::new(),
                calls: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock only happens inside a failing test
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Limits how many events each listing page returns
    pub fn set_page_size(&self, page_size: usize) {
        self.state().page_size = page_size.max(1);
    }

    /// Makes every insert and patch fail with a server error
    pub fn set_fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    /// Makes every calendar call fail as if the user revoked access
    pub fn set_revoked(&self, revoked: bool) {
        self.state().revoked = revoked;
    }

    /// Invalidates every sync token issued so far
    pub fn expire_sync_tokens(&self) {
        let mut state = self.state();
        state.seq += 1;
        state.token_floor = state.seq;
    }

    /// Creates an event as if a person added it in Google Calendar
    pub fn add_remote_event(&self, summary: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> RemoteEvent {
        let mut state = self.state();
        let id = state.allocate_id();
        let event = RemoteEvent {
            id: id.clone(),
            status: RemoteEventStatus::Confirmed,
            summary: summary.to_string(),
            description: None,
            location: None,
            start: Some(start),
            end: Some(end),
            all_day: false,
            etag: None,
            updated: Utc::now(),
            shoot_id: None,
        };
        state.store(event)
    }

    /// Edits an event as if a person changed it in Google Calendar
    pub fn edit_remote_event(&self, event_id: &str, edit: impl FnOnce(&mut RemoteEvent)) -> Option<RemoteEvent> {
        let mut state = self.state();
        let mut event = state.events.get(event_id)?.event.clone();
        edit(&mut event);
        Some(state.store(event))
    }

    /// Cancels an event, leaving a tombstone visible to incremental listings
    pub fn cancel_remote_event(&self, event_id: &str) -> Option<RemoteEvent> {
        self.edit_remote_event(event_id, |event| event.status = RemoteEventStatus::Cancelled)
    }

    /// Drops an event without a tombstone, so only a full listing notices
    pub fn purge_remote_event(&self, event_id: &str) -> Option<RemoteEvent> {
        self.state().events.remove(event_id).map(|stored| stored.event)
    }

    pub fn event(&self, event_id: &str) -> Option<RemoteEvent> {
        self.state().events.get(event_id).map(|stored| stored.event.clone())
    }

    /// All events that are not cancelled
    pub fn live_events(&self) -> Vec<RemoteEvent> {
        self.state()
            .events
            .values()
            .filter(|stored| !stored.event.is_cancelled())
            .map(|stored| stored.event.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Channels that are currently open, as `channel_id -> resource_id`
    pub fn open_channels(&self) -> BTreeMap<String, String> {
        self.state().channels.clone()
    }
}

impl State {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("evt{}", self.next_id)
    }

    /// Returns a strictly increasing timestamp so remote edits always look
    /// newer than anything written before them
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        self.clock = if now > self.clock { now } else { self.clock + Duration::milliseconds(1) };
        self.clock
    }

    fn store(&mut self, mut event: RemoteEvent) -> RemoteEvent {
        self.seq += 1;
        event.updated = self.tick();
        event.etag = Some(format!("\"etag-{}\"", self.seq));
        self.events.insert(event.id.clone(), StoredEvent { event: event.clone(), seq: self.seq });
        event
    }

    fn check_access(&self) -> Result<(), CalendarError> {
        if self.revoked {
            return Err(CalendarError::Unauthorized);
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), CalendarError> {
        self.check_access()?;
        if self.fail_writes {
            return Err(CalendarError::Api { status: 503, message: "backend unavailable".to_string() });
        }
        Ok(())
    }

    fn grant(&mut self, access_token: String, refresh_token: Option<String>) -> TokenGrant {
        TokenGrant {
            access_token,
            refresh_token,
            expires_at: Some(self.tick() + Duration::hours(1)),
            scope: Some("https://www.googleapis.com/auth/calendar.events".to_string()),
        }
    }
}

fn parse_token(token: &str, prefix: &str) -> Option<u64> {
    token.strip_prefix(prefix)?.parse().ok()
}

#[async_trait]
impl CalendarApi for InMemoryCalendar {
    fn authorization_url(&self, state: &str) -> String {
        format!("https://calendar.invalid/authorize?state={}", state)
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, CalendarError> {
        let mut state = self.state();
        state.calls.push(RecordedCall::ExchangeCode);
        if code.is_empty() || code == "denied" {
            return Err(CalendarError::Unauthorized);
        }
        Ok(state.grant(format!("access-{}", code), Some(format!("refresh-{}", code))))
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenGrant, CalendarError> {
        let mut state = self.state();
        state.calls.push(RecordedCall::RefreshToken);
        state.check_access()?;
        let seq = state.seq;
        Ok(state.grant(format!("access-refreshed-{}-{}", refresh_token, seq), None))
    }

    async fn list_events(
        &self,
        _access_token: &str,
        _calendar_id: &str,
        query: &EventQuery,
    ) -> Result<EventPage, CalendarError> {
        let mut state = self.state();
        state.calls.push(RecordedCall::List { incremental: query.sync_token.is_some() });
        state.check_access()?;

        let matching: Vec<RemoteEvent> = match &query.sync_token {
            Some(token) => {
                let since = parse_token(token, "sync-")
                    .ok_or_else(|| CalendarError::Api { status: 400, message: "bad sync token".to_string() })?;
                if since < state.token_floor {
                    return Err(CalendarError::SyncTokenExpired);
                }
                state
                    .events
                    .values()
                    .filter(|stored| stored.seq > since)
                    .map(|stored| stored.event.clone())
                    .collect()
            }
            None => state
                .events
                .values()
                .filter(|stored| match stored.event.span() {
                    Some((start, end)) => {
                        query.time_max.is_none_or(|max| start < max)
                            && query.time_min.is_none_or(|min| end > min)
                    }
                    None => false,
                })
                .map(|stored| stored.event.clone())
                .collect(),
        };

        let offset = match &query.page_token {
            Some(token) => parse_token(token, "page-")
                .ok_or_else(|| CalendarError::Api { status: 400, message: "bad page token".to_string() })?
                as usize,
            None => 0,
        };
        let end = (offset + state.page_size).min(matching.len());
        let events = matching.get(offset..end).map(<[RemoteEvent]>::to_vec).unwrap_or_default();

        if end < matching.len() {
            Ok(EventPage { events, next_page_token: Some(format!("page-{}", end)), next_sync_token: None })
        } else {
            Ok(EventPage { events, next_page_token: None, next_sync_token: Some(format!("sync-{}", state.seq)) })
        }
    }

    async fn insert_event(
        &self,
        _access_token: &str,
        _calendar_id: &str,
        event: &EventWrite,
    ) -> Result<RemoteEvent, CalendarError> {
        let mut state = self.state();
        state.calls.push(RecordedCall::Insert { shoot_id: event.shoot_id.clone() });
        state.check_write()?;
        let id = state.allocate_id();
        Ok(state.store(RemoteEvent {
            id,
            status: RemoteEventStatus::Confirmed,
            summary: event.summary.clone(),
            description: event.description.clone(),
            location: event.location.clone(),
            start: Some(event.start),
            end: Some(event.end),
            all_day: false,
            etag: None,
            updated: Utc::now(),
            shoot_id: Some(event.shoot_id.clone()),
        }))
    }

    async fn patch_event(
        &self,
        _access_token: &str,
        _calendar_id: &str,
        event_id: &str,
        event: &EventWrite,
    ) -> Result<RemoteEvent, CalendarError> {
        let mut state = self.state();
        state.calls.push(RecordedCall::Patch { event_id: event_id.to_string() });
        state.check_write()?;
        let mut existing = state
            .events
            .get(event_id)
            .map(|stored| stored.event.clone())
            .ok_or(CalendarError::NotFound)?;
        existing.summary = event.summary.clone();
        existing.description = event.description.clone();
        existing.location = event.location.clone();
        existing.start = Some(event.start);
        existing.end = Some(event.end);
        existing.shoot_id = Some(event.shoot_id.clone());
        Ok(state.store(existing))
    }

    async fn delete_event(
        &self,
        _access_token: &str,
        _calendar_id: &str,
        event_id: &str,
    ) -> Result<(), CalendarError> {
        let mut state = self.state();
        state.calls.push(RecordedCall::Delete { event_id: event_id.to_string() });
        state.check_access()?;
        if let Some(mut event) = state.events.get(event_id).map(|stored| stored.event.clone()) {
            event.status = RemoteEventStatus::Cancelled;
            state.store(event);
        }
        Ok(())
    }

    async fn watch_events(
        &self,
        _access_token: &str,
        calendar_id: &str,
        request: &WatchRequest,
    ) -> Result<WatchResponse, CalendarError> {
        let mut state = self.state();
        state.calls.push(RecordedCall::Watch { channel_id: request.channel_id.clone() });
        state.check_access()?;
        let resource_id = format!("resource-{}", calendar_id);
        state.channels.insert(request.channel_id.clone(), resource_id.clone());
        let expires_at = state.tick() + request.ttl;
        Ok(WatchResponse { channel_id: request.channel_id.clone(), resource_id, expires_at })
    }

    async fn stop_channel(
        &self,
        _access_token: &str,
        channel_id: &str,
        _resource_id: &str,
    ) -> Result<(), CalendarError> {
        let mut state = self.state();
        state.calls.push(RecordedCall::Stop { channel_id: channel_id.to_string() });
        state.channels.remove(channel_id);
        Ok(())
    }
}
