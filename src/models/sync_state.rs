use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-user calendar sync bookkeeping, one row per user
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::calendar_sync_states)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
#[diesel(primary_key(user_id))]
pub struct CalendarSyncState {
    user_id: String,
    calendar_id: String,
    /// Opaque cursor from the last successful listing
    #[serde(skip_serializing)]
    sync_token: Option<String>,
    last_sync_at: Option<NaiveDateTime>,
    last_full_sync_at: Option<NaiveDateTime>,
    last_error: Option<String>,
    updated_at: NaiveDateTime,
}

impl CalendarSyncState {
    pub fn new(user_id: String, calendar_id: String) -> Self {
        Self {
            user_id,
            calendar_id,
            sync_token: None,
            last_sync_at: None,
            last_full_sync_at: None,
            last_error: None,
            updated_at: Utc::now().naive_utc(),
        }
    }

    pub fn get_user_id(&self) -> String {
        self.user_id.clone()
    }

    pub fn get_calendar_id(&self) -> String {
        self.calendar_id.clone()
    }

    pub fn set_calendar_id(&mut self, calendar_id: String) {
        self.calendar_id = calendar_id;
    }

    pub fn get_sync_token(&self) -> Option<String> {
        self.sync_token.clone()
    }

    pub fn set_sync_token(&mut self, sync_token: Option<String>) {
        self.sync_token = sync_token;
    }

    pub fn get_last_sync_at(&self) -> Option<DateTime<Utc>> {
        self.last_sync_at.map(|ts| DateTime::from_naive_utc_and_offset(ts, Utc))
    }

    pub fn get_last_full_sync_at(&self) -> Option<DateTime<Utc>> {
        self.last_full_sync_at.map(|ts| DateTime::from_naive_utc_and_offset(ts, Utc))
    }

    pub fn get_last_error(&self) -> Option<String> {
        self.last_error.clone()
    }

    /// Whether an incremental sync is possible
    pub fn has_sync_token(&self) -> bool {
        self.sync_token.is_some()
    }

    /// Records a successful run
    pub fn mark_success(&mut self, at: DateTime<Utc>, full: bool, sync_token: Option<String>) {
        self.sync_token = sync_token;
        self.last_sync_at = Some(at.naive_utc());
        if full {
            self.last_full_sync_at = Some(at.naive_utc());
        }
        self.last_error = None;
        self.updated_at = at.naive_utc();
    }

    /// Records a failed run, keeping the previous cursor
    pub fn mark_failure(&mut self, error: String) {
        self.last_error = Some(error);
        self.updated_at = Utc::now().naive_utc();
    }
}
