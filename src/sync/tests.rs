use super::*;
use crate::calendar::{InMemoryCalendar, RecordedCall};
use crate::dto::UpdateShootDto;
use crate::models::{CalendarEvent, Client, User};
use crate::repo::tests::{seed_user_and_client, setup_test_db};
use chrono::{DurationRound, TimeDelta};

const WEBHOOK_URL: &str = "https://hooks.example.com/webhooks/google-calendar";

struct Harness {
    pool: Arc<DbPool>,
    calendar: Arc<InMemoryCalendar>,
    sync: GoogleCalendarSync,
    user: User,
    client: Client,
}

fn settings() -> SyncSettings {
    SyncSettings {
        calendar_id: "primary".to_string(),
        past_days: 30,
        future_days: 180,
        push_on_write: true,
        webhook_url: Some(WEBHOOK_URL.to_string()),
        channel_ttl: Duration::hours(168),
    }
}

fn harness() -> Harness {
    let pool = setup_test_db();
    let (user, client) = seed_user_and_client(&pool);
    let calendar = Arc::new(InMemoryCalendar::new());
    let sync = GoogleCalendarSync::new(pool.clone(), calendar.clone(), settings());
    Harness { pool, calendar, sync, user, client }
}

/// A harness whose user already has a valid calendar integration
fn connected() -> Harness {
    let h = harness();
    store_integration(&h, Some(Utc::now() + Duration::hours(1)));
    h
}

fn store_integration(h: &Harness, expires_at: Option<DateTime<Utc>>) {
    repo::upsert_integration(
        &h.pool,
        Integration::new(
            h.user.get_id(),
            IntegrationProvider::GoogleCalendar,
            "access".to_string(),
            Some("refresh".to_string()),
            expires_at,
            None,
            "primary".to_string(),
        ),
    )
    .unwrap();
}

/// Whole hours from the start of the current hour, always inside the window
fn hours_ahead(hours: i64) -> DateTime<Utc> {
    Utc::now().duration_trunc(TimeDelta::hours(1)).unwrap() + Duration::hours(24 + hours)
}

fn new_shoot(h: &Harness, title: &str, start_h: i64, end_h: i64) -> Shoot {
    repo::create_shoot(
        &h.pool,
        &h.user.get_id(),
        &h.client.get_id(),
        title.to_string(),
        None,
        None,
        hours_ahead(start_h),
        hours_ahead(end_h),
    )
    .unwrap()
}

fn reload(h: &Harness, shoot: &Shoot) -> Shoot {
    repo::get_shoot(&h.pool, &h.user.get_id(), &shoot.get_id()).unwrap().unwrap()
}

fn cached(h: &Harness, event_id: &str) -> Option<CalendarEvent> {
    repo::get_calendar_event(&h.pool, &h.user.get_id(), event_id).unwrap()
}

async fn pause() {
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
}

#[tokio::test]
async fn test_sync_without_integration_is_not_connected() {
    let h = harness();

    let err = h.sync.sync_user(&h.user.get_id(), SyncMode::Full).await.unwrap_err();
    assert!(matches!(err, SyncError::NotConnected));
    assert!(h.calendar.calls().is_empty());
}

#[tokio::test]
async fn test_first_sync_pulls_events_and_pushes_shoots() {
    let h = connected();
    let remote = h.calendar.add_remote_event("Dentist", hours_ahead(1), hours_ahead(2));
    let shoot = new_shoot(&h, "Lookbook", 4, 6);

    let report = h.sync.sync_user(&h.user.get_id(), SyncMode::Incremental).await.unwrap();

    assert_eq!(report.mode, SyncMode::Full);
    assert_eq!(report.fetched, 1);
    assert_eq!(report.created, 1);
    assert_eq!(report.pushed_created, 1);
    assert!(cached(&h, &remote.id).is_some());

    let linked = reload(&h, &shoot);
    let event_id = linked.get_google_event_id().unwrap();
    assert!(!linked.has_unpushed_changes());
    assert_eq!(h.calendar.event(&event_id).unwrap().shoot_id, Some(shoot.get_id()));
    assert_eq!(cached(&h, &event_id).unwrap().get_shoot_id(), Some(shoot.get_id()));

    let state = repo::get_sync_state(&h.pool, &h.user.get_id()).unwrap().unwrap();
    assert!(state.has_sync_token());
    assert!(state.get_last_full_sync_at().is_some());
}

#[tokio::test]
async fn test_second_sync_without_changes_is_noop() {
    let h = connected();
    h.calendar.add_remote_event("Dentist", hours_ahead(1), hours_ahead(2));
    new_shoot(&h, "Lookbook", 4, 6);

    h.sync.sync_user(&h.user.get_id(), SyncMode::Full).await.unwrap();
    let second = h.sync.sync_user(&h.user.get_id(), SyncMode::Incremental).await.unwrap();
    assert_eq!(second.mode, SyncMode::Incremental);
    assert!(second.is_noop(), "unexpected changes: {:?}", second);

    let third = h.sync.sync_user(&h.user.get_id(), SyncMode::Full).await.unwrap();
    assert!(third.is_noop(), "unexpected changes: {:?}", third);
}

#[tokio::test]
async fn test_expired_sync_token_falls_back_to_full() {
    let h = connected();
    h.sync.sync_user(&h.user.get_id(), SyncMode::Full).await.unwrap();
    let before = repo::get_sync_state(&h.pool, &h.user.get_id()).unwrap().unwrap();

    h.calendar.add_remote_event("Late addition", hours_ahead(3), hours_ahead(4));
    h.calendar.expire_sync_tokens();
    h.calendar.clear_calls();

    let report = h.sync.sync_user(&h.user.get_id(), SyncMode::Incremental).await.unwrap();

    assert_eq!(report.mode, SyncMode::Full);
    assert_eq!(report.created, 1);
    assert_eq!(
        h.calendar.calls(),
        vec![RecordedCall::List { incremental: true }, RecordedCall::List { incremental: false }]
    );
    let after = repo::get_sync_state(&h.pool, &h.user.get_id()).unwrap().unwrap();
    assert_ne!(after.get_sync_token(), before.get_sync_token());
}

#[tokio::test]
async fn test_listing_follows_every_page() {
    let h = connected();
    h.calendar.set_page_size(2);
    for i in 0..5 {
        h.calendar.add_remote_event(&format!("Event {}", i), hours_ahead(i), hours_ahead(i + 1));
    }

    let report = h.sync.sync_user(&h.user.get_id(), SyncMode::Full).await.unwrap();

    assert_eq!(report.fetched, 5);
    assert_eq!(report.created, 5);
}

#[tokio::test]
async fn test_newer_remote_edit_updates_shoot() {
    let h = connected();
    let shoot = new_shoot(&h, "Lookbook", 4, 6);
    h.sync.sync_user(&h.user.get_id(), SyncMode::Full).await.unwrap();
    let event_id = reload(&h, &shoot).get_google_event_id().unwrap();

    pause().await;
    h.calendar.edit_remote_event(&event_id, |event| {
        event.summary = "Lookbook (moved)".to_string();
        event.start = Some(hours_ahead(8));
        event.end = Some(hours_ahead(10));
    });

    let report = h.sync.sync_user(&h.user.get_id(), SyncMode::Incremental).await.unwrap();
    assert_eq!(report.shoots_updated, 1);
    assert_eq!(report.pushed_updated, 0);

    let moved = reload(&h, &shoot);
    assert_eq!(moved.get_title(), "Lookbook (moved)");
    assert_eq!(moved.get_starts_at(), hours_ahead(8));
    assert_eq!(moved.get_ends_at(), hours_ahead(10));
    assert!(!moved.has_unpushed_changes());
}

#[tokio::test]
async fn test_newer_local_edit_is_pushed_not_overwritten() {
    let h = connected();
    let shoot = new_shoot(&h, "Lookbook", 4, 6);
    h.sync.sync_user(&h.user.get_id(), SyncMode::Full).await.unwrap();
    let event_id = reload(&h, &shoot).get_google_event_id().unwrap();

    pause().await;
    h.calendar.edit_remote_event(&event_id, |event| event.summary = "Remote title".to_string());
    pause().await;
    repo::update_shoot(&h.pool, &h.user.get_id(), &shoot.get_id(), &UpdateShootDto {
        title: Some("Local title".to_string()),
        ..UpdateShootDto::default()
    })
    .unwrap();

    let report = h.sync.sync_user(&h.user.get_id(), SyncMode::Incremental).await.unwrap();
    assert_eq!(report.shoots_updated, 0);
    assert_eq!(report.pushed_updated, 1);

    assert_eq!(reload(&h, &shoot).get_title(), "Local title");
    assert_eq!(h.calendar.event(&event_id).unwrap().summary, "Local title");

    let again = h.sync.sync_user(&h.user.get_id(), SyncMode::Incremental).await.unwrap();
    assert!(again.is_noop(), "unexpected changes: {:?}", again);
}

#[tokio::test]
async fn test_remote_cancellation_cancels_shoot() {
    let h = connected();
    let shoot = new_shoot(&h, "Lookbook", 4, 6);
    h.sync.sync_user(&h.user.get_id(), SyncMode::Full).await.unwrap();
    let event_id = reload(&h, &shoot).get_google_event_id().unwrap();

    h.calendar.cancel_remote_event(&event_id);
    let report = h.sync.sync_user(&h.user.get_id(), SyncMode::Incremental).await.unwrap();

    assert_eq!(report.deleted, 1);
    assert_eq!(report.shoots_unlinked, 1);
    assert_eq!(report.pushed_created, 0);
    assert!(cached(&h, &event_id).is_none());

    let cancelled = reload(&h, &shoot);
    assert_eq!(cancelled.get_status(), ShootStatus::Cancelled);
    assert!(cancelled.get_google_event_id().is_none());
}

#[tokio::test]
async fn test_local_cancellation_deletes_remote_event() {
    let h = connected();
    let shoot = new_shoot(&h, "Lookbook", 4, 6);
    h.sync.sync_user(&h.user.get_id(), SyncMode::Full).await.unwrap();
    let event_id = reload(&h, &shoot).get_google_event_id().unwrap();

    pause().await;
    repo::update_shoot(&h.pool, &h.user.get_id(), &shoot.get_id(), &UpdateShootDto {
        status: Some(ShootStatus::Cancelled),
        ..UpdateShootDto::default()
    })
    .unwrap();

    let report = h.sync.sync_user(&h.user.get_id(), SyncMode::Incremental).await.unwrap();
    assert_eq!(report.pushed_deleted, 1);
    assert!(h.calendar.event(&event_id).unwrap().is_cancelled());
    assert!(reload(&h, &shoot).get_google_event_id().is_none());
    assert!(cached(&h, &event_id).is_none());
}

#[tokio::test]
async fn test_full_sync_removes_vanished_events_inside_window_only() {
    let h = connected();
    let busy = h.calendar.add_remote_event("Dentist", hours_ahead(1), hours_ahead(2));
    let shoot = new_shoot(&h, "Lookbook", 4, 6);
    h.sync.sync_user(&h.user.get_id(), SyncMode::Full).await.unwrap();
    let shoot_event = reload(&h, &shoot).get_google_event_id().unwrap();

    let far = Utc::now() + Duration::days(400);
    repo::upsert_calendar_event(
        &h.pool,
        CalendarEvent::new(
            h.user.get_id(),
            "far-away".to_string(),
            "Next year".to_string(),
            far,
            far + Duration::hours(1),
            false,
            "confirmed".to_string(),
            None,
            Utc::now(),
            None,
        ),
    )
    .unwrap();

    h.calendar.purge_remote_event(&busy.id);
    h.calendar.purge_remote_event(&shoot_event);

    let incremental = h.sync.sync_user(&h.user.get_id(), SyncMode::Incremental).await.unwrap();
    assert_eq!(incremental.deleted, 0);

    let report = h.sync.sync_user(&h.user.get_id(), SyncMode::Full).await.unwrap();
    assert_eq!(report.deleted, 2);
    assert_eq!(report.shoots_unlinked, 1);
    assert!(cached(&h, &busy.id).is_none());
    assert!(cached(&h, "far-away").is_some());
    assert_eq!(reload(&h, &shoot).get_status(), ShootStatus::Cancelled);
}

#[tokio::test]
async fn test_push_failure_is_counted_and_retried() {
    let h = connected();
    let shoot = new_shoot(&h, "Lookbook", 4, 6);
    h.calendar.set_fail_writes(true);

    let report = h.sync.sync_user(&h.user.get_id(), SyncMode::Full).await.unwrap();
    assert_eq!(report.push_failures, 1);
    assert!(reload(&h, &shoot).get_google_event_id().is_none());

    h.calendar.set_fail_writes(false);
    let retry = h.sync.sync_user(&h.user.get_id(), SyncMode::Incremental).await.unwrap();
    assert_eq!(retry.pushed_created, 1);
    assert!(reload(&h, &shoot).get_google_event_id().is_some());
}

#[tokio::test]
async fn test_revoked_access_records_failure() {
    let h = connected();
    h.calendar.set_revoked(true);

    let err = h.sync.sync_user(&h.user.get_id(), SyncMode::Full).await.unwrap_err();
    assert!(matches!(err, SyncError::Calendar(CalendarError::Unauthorized)));

    let state = repo::get_sync_state(&h.pool, &h.user.get_id()).unwrap().unwrap();
    assert!(state.get_last_error().is_some());
}

#[tokio::test]
async fn test_expiring_token_is_refreshed_before_use() {
    let h = harness();
    store_integration(&h, Some(Utc::now() + Duration::seconds(30)));

    h.sync.sync_user(&h.user.get_id(), SyncMode::Full).await.unwrap();

    assert_eq!(h.calendar.calls()[0], RecordedCall::RefreshToken);
    let integration = repo::get_integration(&h.pool, &h.user.get_id(), IntegrationProvider::GoogleCalendar)
        .unwrap()
        .unwrap();
    assert!(integration.get_access_token().starts_with("access-refreshed-"));
    assert_eq!(integration.get_refresh_token().as_deref(), Some("refresh"));
}

#[tokio::test]
async fn test_push_shoot_writes_through_and_reinserts_missing_event() {
    let h = connected();
    let shoot = new_shoot(&h, "Lookbook", 4, 6);

    h.sync.push_shoot(&shoot).await.unwrap();
    let first_event = reload(&h, &shoot).get_google_event_id().unwrap();

    h.calendar.purge_remote_event(&first_event);
    pause().await;
    let edited = repo::update_shoot(&h.pool, &h.user.get_id(), &shoot.get_id(), &UpdateShootDto {
        title: Some("Renamed".to_string()),
        ..UpdateShootDto::default()
    })
    .unwrap();

    h.sync.push_shoot(&edited).await.unwrap();
    let second_event = reload(&h, &shoot).get_google_event_id().unwrap();
    assert_ne!(first_event, second_event);
    assert_eq!(h.calendar.event(&second_event).unwrap().summary, "Renamed");
    assert!(cached(&h, &first_event).is_none());
}

#[tokio::test]
async fn test_push_shoot_without_connection_does_nothing() {
    let h = harness();
    let shoot = new_shoot(&h, "Lookbook", 4, 6);

    h.sync.push_shoot(&shoot).await.unwrap();
    assert!(h.calendar.calls().is_empty());
}

#[tokio::test]
async fn test_remove_shoot_event_deletes_remote_copy() {
    let h = connected();
    let shoot = new_shoot(&h, "Lookbook", 4, 6);
    h.sync.push_shoot(&shoot).await.unwrap();
    let linked = reload(&h, &shoot);
    let event_id = linked.get_google_event_id().unwrap();

    let deleted = repo::delete_shoot(&h.pool, &h.user.get_id(), &linked.get_id()).unwrap();
    h.sync.remove_shoot_event(&deleted).await.unwrap();
    assert!(h.calendar.event(&event_id).unwrap().is_cancelled());
    assert!(cached(&h, &event_id).is_none());
    assert!(repo::list_event_deletions(&h.pool, &h.user.get_id()).unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_event_removal_is_retried_by_next_sync() {
    let h = connected();
    let shoot = new_shoot(&h, "Lookbook", 4, 6);
    h.sync.sync_user(&h.user.get_id(), SyncMode::Full).await.unwrap();
    let event_id = reload(&h, &shoot).get_google_event_id().unwrap();

    h.calendar.set_revoked(true);
    let deleted = repo::delete_shoot(&h.pool, &h.user.get_id(), &shoot.get_id()).unwrap();
    assert!(h.sync.remove_shoot_event(&deleted).await.is_err());
    h.calendar.set_revoked(false);
    assert!(!h.calendar.event(&event_id).unwrap().is_cancelled());

    let report = h.sync.sync_user(&h.user.get_id(), SyncMode::Incremental).await.unwrap();
    assert_eq!(report.pushed_deleted, 1);
    assert_eq!(report.conflicts, 0);
    assert!(h.calendar.event(&event_id).unwrap().is_cancelled());
    assert!(cached(&h, &event_id).is_none());
    assert!(repo::list_event_deletions(&h.pool, &h.user.get_id()).unwrap().is_empty());

    let again = h.sync.sync_user(&h.user.get_id(), SyncMode::Full).await.unwrap();
    assert!(again.is_noop(), "unexpected changes: {:?}", again);
    assert!(cached(&h, &event_id).is_none());
}

#[tokio::test]
async fn test_pending_removal_survives_a_failed_sync() {
    let h = connected();
    let shoot = new_shoot(&h, "Lookbook", 4, 6);
    h.sync.sync_user(&h.user.get_id(), SyncMode::Full).await.unwrap();
    let event_id = reload(&h, &shoot).get_google_event_id().unwrap();
    repo::delete_shoot(&h.pool, &h.user.get_id(), &shoot.get_id()).unwrap();

    h.calendar.set_revoked(true);
    assert!(h.sync.sync_user(&h.user.get_id(), SyncMode::Full).await.is_err());
    assert_eq!(repo::list_event_deletions(&h.pool, &h.user.get_id()).unwrap().len(), 1);

    h.calendar.set_revoked(false);
    let report = h.sync.sync_user(&h.user.get_id(), SyncMode::Full).await.unwrap();
    assert_eq!(report.pushed_deleted, 1);
    assert_eq!(report.created, 0);
    assert!(h.calendar.event(&event_id).unwrap().is_cancelled());
}

#[tokio::test]
async fn test_event_naming_a_missing_shoot_is_removed() {
    let h = connected();
    let stray = h.calendar.add_remote_event("Old shoot", hours_ahead(2), hours_ahead(3));
    h.calendar.edit_remote_event(&stray.id, |event| event.shoot_id = Some("deleted-shoot".to_string()));
    h.calendar.add_remote_event("Dentist", hours_ahead(2), hours_ahead(3));

    let report = h.sync.sync_user(&h.user.get_id(), SyncMode::Full).await.unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(report.pushed_deleted, 1);
    assert!(cached(&h, &stray.id).is_none());
    assert!(h.calendar.event(&stray.id).unwrap().is_cancelled());
    assert!(repo::list_event_deletions(&h.pool, &h.user.get_id()).unwrap().is_empty());
}

#[tokio::test]
async fn test_connect_stores_integration_watches_and_syncs() {
    let h = harness();
    new_shoot(&h, "Lookbook", 4, 6);

    let outcome = h.sync.connect(&h.user.get_id(), "good-code").await.unwrap();

    assert_eq!(outcome.integration.get_access_token(), "access-good-code");
    assert!(outcome.watching);
    let report = outcome.initial_sync.unwrap();
    assert_eq!(report.mode, SyncMode::Full);
    assert_eq!(report.pushed_created, 1);
    assert_eq!(h.calendar.open_channels().len(), 1);
}

#[tokio::test]
async fn test_connect_with_denied_code_fails() {
    let h = harness();

    let err = h.sync.connect(&h.user.get_id(), "denied").await.unwrap_err();
    assert!(matches!(err, SyncError::Calendar(CalendarError::Unauthorized)));
    assert!(repo::get_integration(&h.pool, &h.user.get_id(), IntegrationProvider::GoogleCalendar)
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_disconnect_clears_everything() {
    let h = harness();
    let shoot = new_shoot(&h, "Lookbook", 4, 6);
    h.sync.connect(&h.user.get_id(), "good-code").await.unwrap();
    assert!(reload(&h, &shoot).get_google_event_id().is_some());

    repo::queue_event_deletion(&h.pool, &h.user.get_id(), "evt-stale", "shoot-gone").unwrap();

    assert!(h.sync.disconnect(&h.user.get_id()).await.unwrap());

    assert!(h.calendar.open_channels().is_empty());
    assert!(repo::list_event_deletions(&h.pool, &h.user.get_id()).unwrap().is_empty());
    assert!(repo::list_channels_for_user(&h.pool, &h.user.get_id()).unwrap().is_empty());
    assert!(repo::get_sync_state(&h.pool, &h.user.get_id()).unwrap().is_none());
    assert!(reload(&h, &shoot).get_google_event_id().is_none());
    let (start, end) = h.sync.settings().window(Utc::now());
    assert!(repo::list_calendar_events_in_window(&h.pool, &h.user.get_id(), start, end).unwrap().is_empty());

    assert!(!h.sync.disconnect(&h.user.get_id()).await.unwrap());
}

#[tokio::test]
async fn test_start_watch_requires_webhook_url() {
    let h = connected();
    let sync = GoogleCalendarSync::new(
        h.pool.clone(),
        h.calendar.clone(),
        SyncSettings { webhook_url: None, ..settings() },
    );

    let err = sync.start_watch(&h.user.get_id()).await.unwrap_err();
    assert!(matches!(err, SyncError::WebhookNotConfigured));
}

#[tokio::test]
async fn test_start_watch_replaces_previous_channel() {
    let h = connected();
    let first = h.sync.start_watch(&h.user.get_id()).await.unwrap();
    let second = h.sync.start_watch(&h.user.get_id()).await.unwrap();

    let open = h.calendar.open_channels();
    assert_eq!(open.len(), 1);
    assert!(open.contains_key(&second.get_id()));
    assert!(repo::get_webhook_channel(&h.pool, &first.get_id()).unwrap().is_none());
}

#[tokio::test]
async fn test_renew_expiring_channels() {
    let h = connected();
    let original = h.sync.start_watch(&h.user.get_id()).await.unwrap();

    assert_eq!(h.sync.renew_expiring_channels(Utc::now()).await.unwrap(), 0);

    let horizon = original.get_expires_at() + Duration::minutes(1);
    assert_eq!(h.sync.renew_expiring_channels(horizon).await.unwrap(), 1);

    let channels = repo::list_channels_for_user(&h.pool, &h.user.get_id()).unwrap();
    assert_eq!(channels.len(), 1);
    assert_ne!(channels[0].get_id(), original.get_id());
}

#[tokio::test]
async fn test_renewal_drops_channels_of_disconnected_users() {
    let h = connected();
    let channel = h.sync.start_watch(&h.user.get_id()).await.unwrap();
    repo::delete_integration(&h.pool, &h.user.get_id(), IntegrationProvider::GoogleCalendar).unwrap();

    let horizon = channel.get_expires_at() + Duration::minutes(1);
    assert_eq!(h.sync.renew_expiring_channels(horizon).await.unwrap(), 0);
    assert!(repo::get_webhook_channel(&h.pool, &channel.get_id()).unwrap().is_none());
}

fn notification(channel: &WebhookChannel, state: &str, number: Option<i64>) -> Notification {
    Notification {
        channel_id: channel.get_id(),
        token: Some(channel.get_token()),
        resource_id: Some(channel.get_resource_id()),
        resource_state: state.to_string(),
        message_number: number,
    }
}

#[tokio::test]
async fn test_notification_flow() {
    let h = connected();
    h.sync.sync_user(&h.user.get_id(), SyncMode::Full).await.unwrap();
    let channel = h.sync.start_watch(&h.user.get_id()).await.unwrap();

    let outcome = h.sync.handle_notification(notification(&channel, "sync", Some(1))).await;
    assert_eq!(outcome, NotificationOutcome::Handshake);

    h.calendar.add_remote_event("New booking", hours_ahead(2), hours_ahead(3));
    match h.sync.handle_notification(notification(&channel, "exists", Some(2))).await {
        NotificationOutcome::Synced(report) => {
            assert_eq!(report.mode, SyncMode::Incremental);
            assert_eq!(report.created, 1);
        }
        other => panic!("expected a sync, got {:?}", other),
    }

    h.calendar.clear_calls();
    let repeat = h.sync.handle_notification(notification(&channel, "exists", Some(2))).await;
    assert_eq!(repeat, NotificationOutcome::Duplicate);
    let stale = h.sync.handle_notification(notification(&channel, "exists", Some(1))).await;
    assert_eq!(stale, NotificationOutcome::Duplicate);
    assert!(h.calendar.calls().is_empty());
}

#[tokio::test]
async fn test_notifications_with_bad_credentials_are_ignored() {
    let h = connected();
    let channel = h.sync.start_watch(&h.user.get_id()).await.unwrap();
    h.calendar.clear_calls();

    let mut wrong_token = notification(&channel, "exists", Some(5));
    wrong_token.token = Some("forged".to_string());
    assert_eq!(h.sync.handle_notification(wrong_token).await, NotificationOutcome::Rejected);

    let mut wrong_resource = notification(&channel, "exists", Some(5));
    wrong_resource.resource_id = Some("other-resource".to_string());
    assert_eq!(h.sync.handle_notification(wrong_resource).await, NotificationOutcome::Rejected);

    let mut missing_resource = notification(&channel, "exists", Some(5));
    missing_resource.resource_id = None;
    assert_eq!(h.sync.handle_notification(missing_resource).await, NotificationOutcome::Rejected);

    let mut unknown = notification(&channel, "exists", Some(5));
    unknown.channel_id = "nope".to_string();
    assert_eq!(h.sync.handle_notification(unknown).await, NotificationOutcome::UnknownChannel);

    assert!(h.calendar.calls().is_empty());
    let stored = repo::get_webhook_channel(&h.pool, &channel.get_id()).unwrap().unwrap();
    assert!(stored.get_last_message_number().is_none());
}

#[tokio::test]
async fn test_conflicts_after_sync() {
    let h = connected();
    h.calendar.add_remote_event("Dentist", hours_ahead(4), hours_ahead(5));
    let shoot = new_shoot(&h, "Lookbook", 4, 6);

    let report = h.sync.sync_user(&h.user.get_id(), SyncMode::Full).await.unwrap();
    assert_eq!(report.conflicts, 1);

    let overlapping = h
        .sync
        .bookings_overlapping(&h.user.get_id(), hours_ahead(4), hours_ahead(6), Some(&shoot.get_id()))
        .unwrap();
    assert_eq!(overlapping.len(), 1);
    assert_eq!(overlapping[0].title, "Dentist");
}
