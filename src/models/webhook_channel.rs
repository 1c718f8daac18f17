use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// A Google Calendar push-notification subscription
///
/// `id` is the channel id we chose when starting the watch and is echoed back
/// in the `X-Goog-Channel-ID` header of each notification. `token` is a shared
/// secret echoed in `X-Goog-Channel-Token`.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::webhook_channels)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WebhookChannel {
    id: String,
    user_id: String,
    calendar_id: String,
    resource_id: String,
    #[serde(skip_serializing)]
    token: String,
    expires_at: NaiveDateTime,
    last_message_number: Option<i64>,
    created_at: NaiveDateTime,
}

impl WebhookChannel {
    pub fn new(
        id: String,
        user_id: String,
        calendar_id: String,
        resource_id: String,
        token: String,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            calendar_id,
            resource_id,
            token,
            expires_at: expires_at.naive_utc(),
            last_message_number: None,
            created_at: Utc::now().naive_utc(),
        }
    }

    pub fn get_id(&self) -> String {
        self.id.clone()
    }

    pub fn get_user_id(&self) -> String {
        self.user_id.clone()
    }

    pub fn get_calendar_id(&self) -> String {
        self.calendar_id.clone()
    }

    pub fn get_resource_id(&self) -> String {
        self.resource_id.clone()
    }

    pub fn get_token(&self) -> String {
        self.token.clone()
    }

    pub fn get_expires_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.expires_at, Utc)
    }

    pub fn get_last_message_number(&self) -> Option<i64> {
        self.last_message_number
    }

    pub fn get_created_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.created_at, Utc)
    }

    /// Whether a notification with this message number is newer than any
    /// already processed on the channel
    pub fn is_new_message(&self, message_number: i64) -> bool {
        self.last_message_number
            .is_none_or(|last| message_number > last)
    }
}
