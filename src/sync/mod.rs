/// Google Calendar synchronization
///
/// [`GoogleCalendarSync`] reconciles a user's shoots and the local cache of
/// remote events against their Google Calendar. A run pulls remote changes
/// first (incrementally through the stored sync token, or over the whole
/// configured window), applies them, then pushes local edits. Planning is
/// done by the pure functions in [`reconcile`]; this module only loads,
/// calls and stores.
///
/// Database access goes through the synchronous repository functions and is
/// never held across an `.await`.

pub mod conflicts;
pub mod reconcile;

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, distr::Alphanumeric};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::calendar::{CalendarApi, CalendarError, EventQuery, RemoteEvent, WatchRequest};
use crate::config::Config;
use crate::db::DbPool;
use crate::models::{Integration, IntegrationProvider, Shoot, ShootStatus, WebhookChannel};
use crate::repo;

use reconcile::{CacheChange, PushAction, ShootChange};

/// Access tokens this close to expiry are refreshed before use
const TOKEN_REFRESH_LEEWAY_SECS: i64 = 60;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Google Calendar is not connected")]
    NotConnected,
    #[error("no webhook URL is configured")]
    WebhookNotConfigured,
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

/// The parts of [`Config`] the sync service reads
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    /// Calendar new integrations are attached to
    pub calendar_id: String,
    pub past_days: i64,
    pub future_days: i64,
    /// Whether shoot writes are pushed to the calendar immediately
    pub push_on_write: bool,
    /// Public URL Google delivers push notifications to
    pub webhook_url: Option<String>,
    pub channel_ttl: Duration,
}

impl SyncSettings {
    /// The `[start, end)` range a full sync lists
    pub fn window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (now - Duration::days(self.past_days), now + Duration::days(self.future_days))
    }
}

impl From<&Config> for SyncSettings {
    fn from(config: &Config) -> Self {
        Self {
            calendar_id: config.calendar_id.clone(),
            past_days: config.sync_past_days,
            future_days: config.sync_future_days,
            push_on_write: config.push_on_write,
            webhook_url: config.webhook_url.clone(),
            channel_ttl: config.channel_ttl(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Only changes since the stored sync token
    Incremental,
    /// Every event in the configured window
    Full,
}

/// What one sync run did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// The mode that actually ran, after any fallback
    pub mode: SyncMode,
    pub fetched: usize,
    /// Cache rows inserted
    pub created: usize,
    /// Cache rows replaced with a newer revision
    pub updated: usize,
    /// Cache rows removed
    pub deleted: usize,
    /// Shoots that took a remote title or schedule
    pub shoots_updated: usize,
    /// Shoots detached from a cancelled or vanished event
    pub shoots_unlinked: usize,
    pub pushed_created: usize,
    pub pushed_updated: usize,
    pub pushed_deleted: usize,
    pub push_failures: usize,
    /// Overlapping pairs in the window after the run
    pub conflicts: usize,
}

impl SyncReport {
    fn new(mode: SyncMode) -> Self {
        Self {
            mode,
            fetched: 0,
            created: 0,
            updated: 0,
            deleted: 0,
            shoots_updated: 0,
            shoots_unlinked: 0,
            pushed_created: 0,
            pushed_updated: 0,
            pushed_deleted: 0,
            push_failures: 0,
            conflicts: 0,
        }
    }

    /// Whether the run changed anything locally or remotely
    pub fn is_noop(&self) -> bool {
        self.created == 0
            && self.updated == 0
            && self.deleted == 0
            && self.shoots_updated == 0
            && self.shoots_unlinked == 0
            && self.pushed_created == 0
            && self.pushed_updated == 0
            && self.pushed_deleted == 0
    }
}

/// A push notification as delivered in Google's `X-Goog-*` headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub channel_id: String,
    pub token: Option<String>,
    pub resource_id: Option<String>,
    pub resource_state: String,
    pub message_number: Option<i64>,
}

/// How a push notification was handled
///
/// The webhook answers 200 for every outcome; the variants exist for logs
/// and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    UnknownChannel,
    /// The channel token or resource id did not match the stored channel
    Rejected,
    /// The `sync` message sent when a channel opens
    Handshake,
    /// A message number at or below the last one processed
    Duplicate,
    Synced(SyncReport),
    Failed(String),
}

/// Result of connecting a calendar
#[derive(Debug, Clone)]
pub struct ConnectOutcome {
    pub integration: Integration,
    /// The initial full sync, when it succeeded
    pub initial_sync: Option<SyncReport>,
    /// Whether a push channel was opened
    pub watching: bool,
}

enum PushResult {
    Created,
    Updated,
    Deleted,
}

/// Bidirectional sync between shoots and Google Calendar
#[derive(Clone)]
pub struct GoogleCalendarSync {
    pool: Arc<DbPool>,
    api: Arc<dyn CalendarApi>,
    settings: SyncSettings,
}

impl GoogleCalendarSync {
    pub fn new(pool: Arc<DbPool>, api: Arc<dyn CalendarApi>, settings: SyncSettings) -> Self {
        Self { pool, api, settings }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// The consent URL for a user; the user id comes back as the OAuth `state`
    pub fn authorization_url(&self, user_id: &str) -> String {
        self.api.authorization_url(user_id)
    }

    fn integration(&self, user_id: &str) -> Result<Integration, SyncError> {
        repo::get_integration(&self.pool, user_id, IntegrationProvider::GoogleCalendar)?
            .ok_or(SyncError::NotConnected)
    }

    /// Returns a usable access token, refreshing and storing it when it is
    /// about to expire
    async fn access_token(&self, integration: &Integration) -> Result<String, SyncError> {
        let leeway = Duration::seconds(TOKEN_REFRESH_LEEWAY_SECS);
        if !integration.token_expires_within(Utc::now(), leeway) {
            return Ok(integration.get_access_token());
        }

        let Some(refresh_token) = integration.get_refresh_token() else {
            warn!("Access token is expiring and there is no refresh token");
            return Ok(integration.get_access_token());
        };

        let grant = self.api.refresh_access_token(&refresh_token).await?;
        let refreshed = repo::update_integration_tokens(
            &self.pool,
            &integration.get_id(),
            grant.access_token,
            grant.refresh_token,
            grant.expires_at,
        )?;

        info!("Refreshed Google access token");
        Ok(refreshed.get_access_token())
    }

    /// Lists every page of a query
    ///
    /// ### Returns
    ///
    /// All events and the sync token from the last page
    async fn fetch_all(
        &self,
        access_token: &str,
        calendar_id: &str,
        query: EventQuery,
    ) -> Result<(Vec<RemoteEvent>, Option<String>), CalendarError> {
        let mut events = Vec::new();
        let mut page_query = query;

        loop {
            let page = self.api.list_events(access_token, calendar_id, &page_query).await?;
            events.extend(page.events);
            match page.next_page_token {
                Some(next) => page_query = page_query.with_page(Some(next)),
                None => return Ok((events, page.next_sync_token)),
            }
        }
    }

    /// Runs one sync for a user and records the result in the sync state
    ///
    /// ### Arguments
    ///
    /// * `user_id` - The user whose calendar is synced
    /// * `mode` - The requested mode; incremental becomes full when there
    ///   is no stored sync token or the stored one has expired
    ///
    /// ### Returns
    ///
    /// What the run did
    ///
    /// ### Errors
    ///
    /// `SyncError::NotConnected` when the user has no calendar integration.
    /// Any other failure is also stored as the sync state's last error.
    #[instrument(skip(self), fields(user_id = %user_id, mode = ?mode))]
    pub async fn sync_user(&self, user_id: &str, mode: SyncMode) -> Result<SyncReport, SyncError> {
        let integration = self.integration(user_id)?;

        match self.run_sync(&integration, mode).await {
            Ok(report) => {
                info!(
                    fetched = report.fetched,
                    created = report.created,
                    updated = report.updated,
                    deleted = report.deleted,
                    pushed = report.pushed_created + report.pushed_updated + report.pushed_deleted,
                    push_failures = report.push_failures,
                    "Calendar sync finished"
                );
                Ok(report)
            }
            Err(err) => {
                warn!("Calendar sync failed: {}", err);
                if let Err(record_err) = repo::record_sync_failure(
                    &self.pool,
                    user_id,
                    &integration.get_calendar_id(),
                    &err.to_string(),
                ) {
                    warn!("Could not record sync failure: {:#}", record_err);
                }
                Err(err)
            }
        }
    }

    async fn run_sync(&self, integration: &Integration, requested: SyncMode) -> Result<SyncReport, SyncError> {
        let user_id = integration.get_user_id();
        let calendar_id = integration.get_calendar_id();
        let access_token = self.access_token(integration).await?;

        let now = Utc::now();
        let (window_start, window_end) = self.settings.window(now);

        let stored_token = repo::get_sync_state(&self.pool, &user_id)?.and_then(|state| state.get_sync_token());
        let incremental = match (requested, stored_token) {
            (SyncMode::Incremental, Some(token)) => {
                match self.fetch_all(&access_token, &calendar_id, EventQuery::incremental(token)).await {
                    Ok(fetched) => Some(fetched),
                    Err(CalendarError::SyncTokenExpired) => {
                        info!("Sync token expired, falling back to a full sync");
                        repo::clear_sync_token(&self.pool, &user_id)?;
                        None
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            (SyncMode::Incremental, None) => {
                debug!("No sync token stored, running a full sync");
                None
            }
            (SyncMode::Full, _) => None,
        };

        let (mode, (events, next_sync_token)) = match incremental {
            Some(fetched) => (SyncMode::Incremental, fetched),
            None => {
                let query = EventQuery::window(window_start, window_end);
                (SyncMode::Full, self.fetch_all(&access_token, &calendar_id, query).await?)
            }
        };

        let mut report = SyncReport::new(mode);
        report.fetched = events.len();

        for event in &events {
            self.pull_event(&user_id, event, &mut report)?;
        }

        if mode == SyncMode::Full {
            let seen: Vec<String> = events.iter().map(|e| e.id.clone()).collect();
            self.remove_vanished(&user_id, window_start, window_end, &seen, &mut report)?;
        }

        let pending = repo::list_shoots_needing_push(&self.pool, &user_id, window_start, window_end)?;
        for action in reconcile::plan_push(&pending) {
            match self.execute_push(&user_id, &access_token, &calendar_id, &action).await {
                Ok(PushResult::Created) => report.pushed_created += 1,
                Ok(PushResult::Updated) => report.pushed_updated += 1,
                Ok(PushResult::Deleted) => report.pushed_deleted += 1,
                Err(err) => {
                    warn!(shoot_id = %action.shoot_id(), "Push failed: {}", err);
                    report.push_failures += 1;
                }
            }
        }

        self.drain_event_deletions(&user_id, &access_token, &calendar_id, &mut report).await?;

        repo::record_sync_success(
            &self.pool,
            &user_id,
            &calendar_id,
            next_sync_token,
            Utc::now(),
            mode == SyncMode::Full,
        )?;

        report.conflicts = self.conflicts_in(&user_id, window_start, window_end)?.len();
        Ok(report)
    }

    /// Finds the shoot an event belongs to, by link first and then by the
    /// `shootId` private property
    fn shoot_for_event(&self, user_id: &str, event: &RemoteEvent) -> Result<Option<Shoot>, SyncError> {
        if let Some(shoot) = repo::get_shoot_by_event_id(&self.pool, user_id, &event.id)? {
            return Ok(Some(shoot));
        }
        match &event.shoot_id {
            Some(shoot_id) => Ok(repo::get_shoot(&self.pool, user_id, shoot_id)?),
            None => Ok(None),
        }
    }

    fn pull_event(&self, user_id: &str, event: &RemoteEvent, report: &mut SyncReport) -> Result<(), SyncError> {
        let cached = repo::get_calendar_event(&self.pool, user_id, &event.id)?;
        let shoot = self.shoot_for_event(user_id, event)?;

        let deletion_pending = repo::is_event_deletion_pending(&self.pool, user_id, &event.id)?;
        let owner_exists = match (&shoot, &event.shoot_id) {
            (None, Some(shoot_id)) => Some(repo::shoot_exists(&self.pool, shoot_id)?),
            _ => None,
        };
        if reconcile::is_orphaned(event, deletion_pending, owner_exists) {
            debug!(event_id = %event.id, "Event of a deleted shoot, queuing removal");
            if !deletion_pending {
                let shoot_id = event.shoot_id.clone().unwrap_or_default();
                repo::queue_event_deletion(&self.pool, user_id, &event.id, &shoot_id)?;
            }
            if repo::delete_calendar_event(&self.pool, user_id, &event.id)?.is_some() {
                report.deleted += 1;
            }
            return Ok(());
        }

        let step = reconcile::plan_pull(event, cached.as_ref(), shoot.as_ref());

        if step.is_noop() {
            return Ok(());
        }
        debug!(event_id = %event.id, ?step, "Applying remote change");

        let mirrored_shoot = shoot
            .as_ref()
            .filter(|s| s.get_google_event_id().is_none_or(|id| id == event.id))
            .map(|s| s.get_id());

        match step.cache {
            CacheChange::Create | CacheChange::Update => {
                if let Some(row) = reconcile::cache_row(user_id, event, mirrored_shoot) {
                    let (_, created) = repo::upsert_calendar_event(&self.pool, row)?;
                    if created {
                        report.created += 1;
                    } else {
                        report.updated += 1;
                    }
                }
            }
            CacheChange::Remove => {
                repo::delete_calendar_event(&self.pool, user_id, &event.id)?;
                report.deleted += 1;
            }
            CacheChange::Unchanged | CacheChange::Absent => {}
        }

        match step.shoot {
            ShootChange::None => {}
            ShootChange::Link { shoot_id } => {
                repo::link_shoot_to_event(&self.pool, &shoot_id, &event.id, event.updated)?;
            }
            ShootChange::ApplyRemote { shoot_id, title, starts_at, ends_at, remote_updated_at, link } => {
                if link {
                    repo::link_shoot_to_event(&self.pool, &shoot_id, &event.id, remote_updated_at)?;
                }
                repo::apply_remote_schedule(&self.pool, &shoot_id, &title, starts_at, ends_at, remote_updated_at)?;
                report.shoots_updated += 1;
            }
            ShootChange::Cancel { shoot_id } => {
                repo::unlink_shoot_event(&self.pool, &shoot_id, Some(ShootStatus::Cancelled))?;
                report.shoots_unlinked += 1;
            }
        }

        Ok(())
    }

    /// Drops cached events a full listing no longer returns
    ///
    /// Such events were deleted outright on the remote side. A shoot that
    /// mirrored one is cancelled, the same as for a remote cancellation.
    fn remove_vanished(
        &self,
        user_id: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        seen: &[String],
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let removed = repo::delete_calendar_events_not_in(&self.pool, user_id, window_start, window_end, seen)?;

        for row in removed {
            report.deleted += 1;
            if let Some(shoot) = repo::get_shoot_by_event_id(&self.pool, user_id, &row.get_google_event_id())? {
                repo::unlink_shoot_event(&self.pool, &shoot.get_id(), Some(ShootStatus::Cancelled))?;
                report.shoots_unlinked += 1;
            }
        }
        Ok(())
    }

    /// Removes the events of locally deleted shoots from the provider
    ///
    /// A failure is counted like any other push failure and the entry stays
    /// queued for the next run.
    async fn drain_event_deletions(
        &self,
        user_id: &str,
        access_token: &str,
        calendar_id: &str,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        for deletion in repo::list_event_deletions(&self.pool, user_id)? {
            let event_id = deletion.get_google_event_id();
            match self.api.delete_event(access_token, calendar_id, &event_id).await {
                Ok(()) => {
                    repo::clear_event_deletion(&self.pool, user_id, &event_id)?;
                    repo::delete_calendar_event(&self.pool, user_id, &event_id)?;
                    report.pushed_deleted += 1;
                }
                Err(err) => {
                    warn!(shoot_id = %deletion.get_shoot_id(), event_id = %event_id, "Event removal failed: {}", err);
                    report.push_failures += 1;
                }
            }
        }
        Ok(())
    }

    async fn execute_push(
        &self,
        user_id: &str,
        access_token: &str,
        calendar_id: &str,
        action: &PushAction,
    ) -> Result<PushResult, SyncError> {
        match action {
            PushAction::Insert { shoot_id, event } => {
                let remote = self.api.insert_event(access_token, calendar_id, event).await?;
                self.record_pushed(user_id, shoot_id, &remote, true)?;
                Ok(PushResult::Created)
            }
            PushAction::Patch { shoot_id, event_id, event } => {
                match self.api.patch_event(access_token, calendar_id, event_id, event).await {
                    Ok(remote) => {
                        self.record_pushed(user_id, shoot_id, &remote, false)?;
                        Ok(PushResult::Updated)
                    }
                    Err(CalendarError::NotFound) => {
                        info!(shoot_id = %shoot_id, "Linked event is gone, inserting a new one");
                        repo::delete_calendar_event(&self.pool, user_id, event_id)?;
                        let remote = self.api.insert_event(access_token, calendar_id, event).await?;
                        self.record_pushed(user_id, shoot_id, &remote, true)?;
                        Ok(PushResult::Created)
                    }
                    Err(err) => Err(err.into()),
                }
            }
            PushAction::Delete { shoot_id, event_id } => {
                self.api.delete_event(access_token, calendar_id, event_id).await?;
                repo::unlink_shoot_event(&self.pool, shoot_id, None)?;
                repo::delete_calendar_event(&self.pool, user_id, event_id)?;
                Ok(PushResult::Deleted)
            }
        }
    }

    /// Stores the outcome of a successful insert or patch
    ///
    /// The returned revision goes straight into the cache so the next pull
    /// recognizes it as already applied.
    fn record_pushed(&self, user_id: &str, shoot_id: &str, remote: &RemoteEvent, link: bool) -> Result<(), SyncError> {
        let synced_at = Utc::now().max(remote.updated);
        if link {
            repo::link_shoot_to_event(&self.pool, shoot_id, &remote.id, synced_at)?;
        } else {
            repo::mark_shoot_synced(&self.pool, shoot_id, synced_at)?;
        }
        if let Some(row) = reconcile::cache_row(user_id, remote, Some(shoot_id.to_string())) {
            repo::upsert_calendar_event(&self.pool, row)?;
        }
        Ok(())
    }

    /// Pushes one shoot right after it was written
    ///
    /// Does nothing when the user has no calendar connected or the shoot
    /// needs no push. A failure leaves the shoot marked as unpushed, so the
    /// next sync run retries it.
    #[instrument(skip(self, shoot), fields(shoot_id = %shoot.get_id()))]
    pub async fn push_shoot(&self, shoot: &Shoot) -> Result<(), SyncError> {
        let Some(action) = reconcile::push_action_for(shoot) else {
            return Ok(());
        };
        let integration = match self.integration(&shoot.get_user_id()) {
            Ok(integration) => integration,
            Err(SyncError::NotConnected) => return Ok(()),
            Err(err) => return Err(err),
        };

        let access_token = self.access_token(&integration).await?;
        self.execute_push(&shoot.get_user_id(), &access_token, &integration.get_calendar_id(), &action)
            .await?;
        info!("Pushed shoot to Google Calendar");
        Ok(())
    }

    /// Deletes the event of a shoot that was deleted locally
    ///
    /// On failure the deletion queued by `repo::delete_shoot` stays in place
    /// and the next sync run retries it.
    #[instrument(skip(self, shoot), fields(shoot_id = %shoot.get_id()))]
    pub async fn remove_shoot_event(&self, shoot: &Shoot) -> Result<(), SyncError> {
        let Some(event_id) = shoot.get_google_event_id() else {
            return Ok(());
        };
        let user_id = shoot.get_user_id();
        let integration = match self.integration(&user_id) {
            Ok(integration) => integration,
            Err(SyncError::NotConnected) => return Ok(()),
            Err(err) => return Err(err),
        };

        let access_token = self.access_token(&integration).await?;
        self.api
            .delete_event(&access_token, &integration.get_calendar_id(), &event_id)
            .await?;
        repo::clear_event_deletion(&self.pool, &user_id, &event_id)?;
        repo::delete_calendar_event(&self.pool, &user_id, &event_id)?;
        info!("Removed calendar event of deleted shoot");
        Ok(())
    }

    /// Completes the OAuth flow for a user
    ///
    /// Stores the integration, opens a push channel when a webhook URL is
    /// configured and runs the first full sync. Failures of the last two
    /// are logged; the connection itself still succeeds.
    #[instrument(skip(self, code), fields(user_id = %user_id))]
    pub async fn connect(&self, user_id: &str, code: &str) -> Result<ConnectOutcome, SyncError> {
        let grant = self.api.exchange_code(code).await?;
        let integration = repo::upsert_integration(
            &self.pool,
            Integration::new(
                user_id.to_string(),
                IntegrationProvider::GoogleCalendar,
                grant.access_token,
                grant.refresh_token,
                grant.expires_at,
                grant.scope,
                self.settings.calendar_id.clone(),
            ),
        )?;
        info!("Connected Google Calendar");

        let watching = match self.settings.webhook_url {
            Some(_) => match self.start_watch(user_id).await {
                Ok(_) => true,
                Err(err) => {
                    warn!("Could not open push channel: {}", err);
                    false
                }
            },
            None => false,
        };

        let initial_sync = self.sync_user(user_id, SyncMode::Full).await.ok();

        Ok(ConnectOutcome { integration, initial_sync, watching })
    }

    /// Removes the user's calendar connection and everything derived from it
    ///
    /// ### Returns
    ///
    /// Whether a connection existed
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn disconnect(&self, user_id: &str) -> Result<bool, SyncError> {
        let integration = repo::get_integration(&self.pool, user_id, IntegrationProvider::GoogleCalendar)?;
        let channels = repo::list_channels_for_user(&self.pool, user_id)?;

        if let Some(integration) = &integration {
            match self.access_token(integration).await {
                Ok(token) => self.stop_channels(&token, &channels).await,
                Err(err) => warn!("Skipping channel shutdown: {}", err),
            }
        }
        for channel in &channels {
            repo::delete_webhook_channel(&self.pool, &channel.get_id())?;
        }

        let existed = repo::delete_integration(&self.pool, user_id, IntegrationProvider::GoogleCalendar)?;
        repo::delete_sync_state(&self.pool, user_id)?;
        repo::delete_calendar_events_for_user(&self.pool, user_id)?;
        repo::delete_event_deletions_for_user(&self.pool, user_id)?;
        repo::unlink_all_shoots_for_user(&self.pool, user_id)?;

        info!("Disconnected Google Calendar");
        Ok(existed)
    }

    /// Stops channels on the provider, ignoring failures
    async fn stop_channels(&self, access_token: &str, channels: &[WebhookChannel]) {
        for channel in channels {
            if let Err(err) = self
                .api
                .stop_channel(access_token, &channel.get_id(), &channel.get_resource_id())
                .await
            {
                warn!(channel_id = %channel.get_id(), "Could not stop channel: {}", err);
            }
        }
    }

    /// Opens a push channel for the user's calendar, replacing any existing ones
    ///
    /// ### Returns
    ///
    /// The stored channel
    ///
    /// ### Errors
    ///
    /// `SyncError::WebhookNotConfigured` when there is no public webhook URL
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn start_watch(&self, user_id: &str) -> Result<WebhookChannel, SyncError> {
        let address = self.settings.webhook_url.clone().ok_or(SyncError::WebhookNotConfigured)?;
        let integration = self.integration(user_id)?;
        let access_token = self.access_token(&integration).await?;
        let calendar_id = integration.get_calendar_id();

        let request = WatchRequest {
            channel_id: uuid::Uuid::new_v4().to_string(),
            token: channel_token(),
            address,
            ttl: self.settings.channel_ttl,
        };
        let response = self.api.watch_events(&access_token, &calendar_id, &request).await?;

        let channel = WebhookChannel::new(
            response.channel_id,
            user_id.to_string(),
            calendar_id,
            response.resource_id,
            request.token,
            response.expires_at,
        );
        repo::create_webhook_channel(&self.pool, &channel)?;

        let previous: Vec<WebhookChannel> = repo::list_channels_for_user(&self.pool, user_id)?
            .into_iter()
            .filter(|c| c.get_id() != channel.get_id())
            .collect();
        self.stop_channels(&access_token, &previous).await;
        for old in &previous {
            repo::delete_webhook_channel(&self.pool, &old.get_id())?;
        }

        info!(channel_id = %channel.get_id(), "Opened push channel");
        Ok(channel)
    }

    /// Replaces every channel expiring before `before`
    ///
    /// Channels of users who are no longer connected are dropped.
    ///
    /// ### Returns
    ///
    /// How many users got a fresh channel
    #[instrument(skip(self))]
    pub async fn renew_expiring_channels(&self, before: DateTime<Utc>) -> Result<usize, SyncError> {
        let expiring = repo::list_channels_expiring_before(&self.pool, before)?;
        let users: BTreeSet<String> = expiring.iter().map(|c| c.get_user_id()).collect();

        let mut renewed = 0;
        for user_id in users {
            match self.start_watch(&user_id).await {
                Ok(_) => renewed += 1,
                Err(SyncError::NotConnected) => {
                    for channel in expiring.iter().filter(|c| c.get_user_id() == user_id) {
                        repo::delete_webhook_channel(&self.pool, &channel.get_id())?;
                    }
                }
                Err(err) => warn!(user_id = %user_id, "Channel renewal failed: {}", err),
            }
        }

        if renewed > 0 {
            info!("Renewed {} push channels", renewed);
        }
        Ok(renewed)
    }

    /// Handles one push notification
    ///
    /// Notifications carry no event data, only a signal that something
    /// changed, so a valid new message triggers an incremental sync.
    /// Deliveries can repeat or arrive out of order; message numbers at or
    /// below the last processed one are skipped.
    #[instrument(skip(self, notification), fields(channel_id = %notification.channel_id, state = %notification.resource_state))]
    pub async fn handle_notification(&self, notification: Notification) -> NotificationOutcome {
        let channel = match repo::get_webhook_channel(&self.pool, &notification.channel_id) {
            Ok(Some(channel)) => channel,
            Ok(None) => {
                info!("Notification for unknown channel ignored");
                return NotificationOutcome::UnknownChannel;
            }
            Err(err) => return NotificationOutcome::Failed(format!("{:#}", err)),
        };

        let token_matches = notification.token.as_deref() == Some(channel.get_token().as_str());
        let resource_matches = notification.resource_id.as_deref() == Some(channel.get_resource_id().as_str());
        if !token_matches || !resource_matches {
            warn!("Notification with mismatched channel credentials ignored");
            return NotificationOutcome::Rejected;
        }

        if let Some(number) = notification.message_number {
            match repo::record_channel_message(&self.pool, &channel.get_id(), number) {
                Ok(true) => {}
                Ok(false) => {
                    debug!(message_number = number, "Duplicate or stale notification skipped");
                    return NotificationOutcome::Duplicate;
                }
                Err(err) => return NotificationOutcome::Failed(format!("{:#}", err)),
            }
        }

        if notification.resource_state == "sync" {
            debug!("Channel handshake received");
            return NotificationOutcome::Handshake;
        }

        match self.sync_user(&channel.get_user_id(), SyncMode::Incremental).await {
            Ok(report) => NotificationOutcome::Synced(report),
            Err(err) => NotificationOutcome::Failed(err.to_string()),
        }
    }

    /// Overlapping bookings among the user's shoots and cached events
    pub fn conflicts_in(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<conflicts::Conflict>, SyncError> {
        let shoots = repo::list_shoots_in_window(&self.pool, user_id, start, end)?;
        let events = repo::list_calendar_events_in_window(&self.pool, user_id, start, end)?;
        Ok(conflicts::find_conflicts(&shoots, &events))
    }

    /// Bookings overlapping a proposed slot
    pub fn bookings_overlapping(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_shoot_id: Option<&str>,
    ) -> Result<Vec<conflicts::Booking>, SyncError> {
        let shoots = repo::list_shoots_in_window(&self.pool, user_id, start, end)?;
        let events = repo::list_calendar_events_in_window(&self.pool, user_id, start, end)?;
        Ok(conflicts::conflicts_for_window(start, end, exclude_shoot_id, &shoots, &events))
    }
}

/// Random shared secret echoed back in `X-Goog-Channel-Token`
fn channel_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests;
