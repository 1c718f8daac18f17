use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Local cached copy of an event on a user's Google Calendar
///
/// Rows are keyed by `(user_id, google_event_id)`. Cancelled events are never
/// cached: a cancellation deletes the row.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::calendar_events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct CalendarEvent {
    id: String,
    user_id: String,
    google_event_id: String,
    summary: String,
    starts_at: NaiveDateTime,
    ends_at: NaiveDateTime,
    all_day: bool,
    status: String,
    etag: Option<String>,
    remote_updated_at: NaiveDateTime,
    /// The shoot this event mirrors, if any
    shoot_id: Option<String>,
    synced_at: NaiveDateTime,
}

impl CalendarEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: String,
        google_event_id: String,
        summary: String,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        all_day: bool,
        status: String,
        etag: Option<String>,
        remote_updated_at: DateTime<Utc>,
        shoot_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            google_event_id,
            summary,
            starts_at: starts_at.naive_utc(),
            ends_at: ends_at.naive_utc(),
            all_day,
            status,
            etag,
            remote_updated_at: remote_updated_at.naive_utc(),
            shoot_id,
            synced_at: Utc::now().naive_utc(),
        }
    }

    pub fn get_id(&self) -> String {
        self.id.clone()
    }

    /// Keeps the row identity of an existing cache entry when replacing it
    pub fn set_id(&mut self, id: String) {
        self.id = id;
    }

    pub fn get_user_id(&self) -> String {
        self.user_id.clone()
    }

    pub fn get_google_event_id(&self) -> String {
        self.google_event_id.clone()
    }

    pub fn get_summary(&self) -> String {
        self.summary.clone()
    }

    pub fn get_starts_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.starts_at, Utc)
    }

    pub fn get_ends_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.ends_at, Utc)
    }

    pub fn is_all_day(&self) -> bool {
        self.all_day
    }

    pub fn get_status(&self) -> String {
        self.status.clone()
    }

    pub fn get_etag(&self) -> Option<String> {
        self.etag.clone()
    }

    pub fn get_remote_updated_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.remote_updated_at, Utc)
    }

    pub fn get_shoot_id(&self) -> Option<String> {
        self.shoot_id.clone()
    }

    pub fn get_synced_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.synced_at, Utc)
    }

    /// Whether the cached row already reflects this remote revision
    pub fn matches_revision(&self, etag: Option<&str>, remote_updated_at: DateTime<Utc>) -> bool {
        match (self.etag.as_deref(), etag) {
            (Some(ours), Some(theirs)) => ours == theirs,
            _ => self.get_remote_updated_at() == remote_updated_at,
        }
    }
}
