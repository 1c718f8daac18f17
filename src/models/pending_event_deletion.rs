use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// A calendar event whose shoot was deleted locally but which may still
/// exist remotely
///
/// Rows are written in the same transaction that deletes the shoot and are
/// cleared once the provider confirms the event is gone, so a failed or
/// skipped remote delete is retried by the next sync.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::pending_event_deletions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PendingEventDeletion {
    user_id: String,
    google_event_id: String,
    shoot_id: String,
    created_at: NaiveDateTime,
}

impl PendingEventDeletion {
    pub fn new(user_id: String, google_event_id: String, shoot_id: String) -> Self {
        Self {
            user_id,
            google_event_id,
            shoot_id,
            created_at: Utc::now().naive_utc(),
        }
    }

    pub fn get_user_id(&self) -> String {
        self.user_id.clone()
    }

    pub fn get_google_event_id(&self) -> String {
        self.google_event_id.clone()
    }

    /// The id of the deleted shoot, kept for logging
    pub fn get_shoot_id(&self) -> String {
        self.shoot_id.clone()
    }

    pub fn get_created_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.created_at, Utc)
    }
}
