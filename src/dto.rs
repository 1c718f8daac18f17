use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{PostIdeaStatus, ShootStatus};

/// Data transfer object for creating a new client
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateClientDto {
    /// The client's name
    pub name: String,

    /// Where to reach the client
    #[serde(default)]
    pub contact_email: Option<String>,

    /// Free-form notes
    #[serde(default)]
    pub notes: Option<String>,
}

/// Data transfer object for partially updating a client
///
/// Fields left out of the request are unchanged.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct UpdateClientDto {
    pub name: Option<String>,
    pub contact_email: Option<String>,
    pub notes: Option<String>,
}

/// Data transfer object for creating a new shoot
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateShootDto {
    /// The client the shoot is for
    pub client_id: String,

    /// Short title, also used as the calendar event summary
    pub title: String,

    /// Where the shoot takes place
    #[serde(default)]
    pub location: Option<String>,

    /// Free-form notes
    #[serde(default)]
    pub notes: Option<String>,

    /// When the shoot starts
    pub starts_at: DateTime<Utc>,

    /// When the shoot ends
    pub ends_at: DateTime<Utc>,
}

/// Data transfer object for partially updating a shoot
///
/// Fields left out of the request are unchanged.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct UpdateShootDto {
    pub client_id: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub status: Option<ShootStatus>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl UpdateShootDto {
    /// Whether applying this update can change the linked calendar event
    pub fn touches_calendar(&self) -> bool {
        self.title.is_some()
            || self.location.is_some()
            || self.notes.is_some()
            || self.status.is_some()
            || self.starts_at.is_some()
            || self.ends_at.is_some()
    }
}

/// Filters for listing shoots
///
/// Deserialized from the query string; `statuses` may be repeated
/// (`?statuses=scheduled&statuses=completed`).
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ShootQuery {
    /// Only shoots for this client
    pub client_id: Option<String>,

    /// Only shoots in one of these statuses (all statuses when empty)
    pub statuses: Vec<ShootStatus>,

    /// Only shoots starting at or after this time
    pub starts_after: Option<DateTime<Utc>>,

    /// Only shoots starting before this time
    pub starts_before: Option<DateTime<Utc>>,
}

impl std::fmt::Display for ShootQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "client_id={:?} statuses={:?} starts_after={:?} starts_before={:?}",
            self.client_id, self.statuses, self.starts_after, self.starts_before
        )
    }
}

/// Data transfer object for creating a post idea on a shoot
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreatePostIdeaDto {
    pub title: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
}

/// Data transfer object for partially updating a post idea
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct UpdatePostIdeaDto {
    pub title: Option<String>,
    pub caption: Option<String>,
    pub platform: Option<String>,
    pub status: Option<PostIdeaStatus>,
}

/// Request body for triggering a calendar sync
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default)]
#[serde(default)]
pub struct SyncRequestDto {
    /// Ignore the stored sync token and re-list the whole window
    pub full: bool,
}

/// A time window given in the query string
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct WindowQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Query for the conflict-detection endpoint
///
/// With both `start` and `end`, lists bookings overlapping that proposed
/// slot. Without them, lists every conflict in the sync window.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ConflictQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Shoot to leave out, e.g. the one being rescheduled
    pub exclude_shoot_id: Option<String>,
}

/// Query string of the OAuth redirect back from Google
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    /// The user id the flow was started for
    pub state: Option<String>,
    /// Set by Google when the user denied access
    pub error: Option<String>,
}

#[cfg(test)]
mod tests;
