use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ParseEnumError;

/// Lifecycle of a shoot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShootStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl ShootStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShootStatus::Scheduled => "scheduled",
            ShootStatus::Completed => "completed",
            ShootStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ShootStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShootStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(ShootStatus::Scheduled),
            "completed" => Ok(ShootStatus::Completed),
            "cancelled" => Ok(ShootStatus::Cancelled),
            other => Err(ParseEnumError::new("shoot status", other)),
        }
    }
}

/// Represents a scheduled content-production session for a client
///
/// A shoot may be linked to exactly one Google Calendar event through
/// `google_event_id`. `calendar_synced_at` records when the linked event last
/// matched this row; a shoot edited after that moment has changes that still
/// need to be pushed to the calendar.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::shoots)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct Shoot {
    /// Unique identifier for the shoot (UUID v4 as string)
    id: String,

    /// The user who owns the shoot and whose calendar it is synced to
    user_id: String,

    /// The client the shoot is produced for
    client_id: String,

    /// Short title, used as the calendar event summary
    title: String,

    /// Where the shoot takes place
    location: Option<String>,

    /// Free-form notes, used as the calendar event description
    notes: Option<String>,

    /// Stored status name, see [`ShootStatus`]
    status: String,

    /// When the shoot starts
    starts_at: NaiveDateTime,

    /// When the shoot ends, always after `starts_at`
    ends_at: NaiveDateTime,

    /// The linked Google Calendar event, if any
    google_event_id: Option<String>,

    /// When the linked event was last brought in line with this row
    calendar_synced_at: Option<NaiveDateTime>,

    /// When this shoot was created
    created_at: NaiveDateTime,

    /// When this shoot was last modified
    updated_at: NaiveDateTime,
}

impl Shoot {
    /// Creates a new scheduled shoot
    ///
    /// The caller is responsible for checking that `starts_at < ends_at`;
    /// `repo::create_shoot` does so before inserting.
    pub fn new(
        user_id: String,
        client_id: String,
        title: String,
        location: Option<String>,
        notes: Option<String>,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            client_id,
            title,
            location,
            notes,
            status: ShootStatus::Scheduled.as_str().to_string(),
            starts_at: starts_at.naive_utc(),
            ends_at: ends_at.naive_utc(),
            google_event_id: None,
            calendar_synced_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn get_id(&self) -> String {
        self.id.clone()
    }

    pub fn get_user_id(&self) -> String {
        self.user_id.clone()
    }

    pub fn get_client_id(&self) -> String {
        self.client_id.clone()
    }

    pub fn set_client_id(&mut self, client_id: String) {
        self.client_id = client_id;
    }

    pub fn get_title(&self) -> String {
        self.title.clone()
    }

    pub fn set_title(&mut self, title: String) {
        self.title = title;
    }

    pub fn get_location(&self) -> Option<String> {
        self.location.clone()
    }

    pub fn set_location(&mut self, location: Option<String>) {
        self.location = location;
    }

    pub fn get_notes(&self) -> Option<String> {
        self.notes.clone()
    }

    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes;
    }

    /// Gets the shoot's status, treating unknown stored values as scheduled
    pub fn get_status(&self) -> ShootStatus {
        self.status.parse().unwrap_or(ShootStatus::Scheduled)
    }

    pub fn set_status(&mut self, status: ShootStatus) {
        self.status = status.as_str().to_string();
    }

    pub fn get_starts_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.starts_at, Utc)
    }

    pub fn get_ends_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.ends_at, Utc)
    }

    /// Moves the shoot to a new time slot
    pub fn set_schedule(&mut self, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) {
        self.starts_at = starts_at.naive_utc();
        self.ends_at = ends_at.naive_utc();
    }

    pub fn get_google_event_id(&self) -> Option<String> {
        self.google_event_id.clone()
    }

    pub fn get_calendar_synced_at(&self) -> Option<DateTime<Utc>> {
        self.calendar_synced_at
            .map(|ts| DateTime::from_naive_utc_and_offset(ts, Utc))
    }

    pub fn get_created_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.created_at, Utc)
    }

    pub fn get_updated_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.updated_at, Utc)
    }

    /// Sets the modification timestamp explicitly
    ///
    /// Used when a remote edit is applied, so the shoot carries the remote
    /// edit time rather than the time the sync happened to run.
    pub fn set_updated_at(&mut self, updated_at: DateTime<Utc>) {
        self.updated_at = updated_at.naive_utc();
    }

    /// Bumps the modification timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().naive_utc();
    }

    /// Links the shoot to a calendar event and marks it as in sync
    pub fn link_event(&mut self, google_event_id: String, synced_at: DateTime<Utc>) {
        self.google_event_id = Some(google_event_id);
        self.calendar_synced_at = Some(synced_at.naive_utc());
    }

    /// Marks the linked event as matching this row as of `synced_at`
    pub fn mark_synced(&mut self, synced_at: DateTime<Utc>) {
        self.calendar_synced_at = Some(synced_at.naive_utc());
    }

    /// Forgets the linked calendar event
    pub fn unlink_event(&mut self) {
        self.google_event_id = None;
        self.calendar_synced_at = None;
    }

    /// Whether the shoot occupies the calendar (cancelled shoots do not)
    pub fn is_active(&self) -> bool {
        self.get_status() != ShootStatus::Cancelled
    }

    /// Whether local edits have not yet reached the linked calendar event
    pub fn has_unpushed_changes(&self) -> bool {
        match (&self.google_event_id, self.calendar_synced_at) {
            (Some(_), Some(synced)) => self.updated_at > synced,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// Whether the shoot overlaps the half-open interval `[start, end)`
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.get_starts_at() < end && start < self.get_ends_at()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample_shoot() -> Shoot {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        Shoot::new(
            "user".to_string(),
            "client".to_string(),
            "Spring lookbook".to_string(),
            Some("Studio B".to_string()),
            None,
            start,
            start + Duration::hours(3),
        )
    }

    #[test]
    fn test_shoot_new_is_scheduled_and_unlinked() {
        let shoot = sample_shoot();

        assert_eq!(shoot.get_status(), ShootStatus::Scheduled);
        assert!(shoot.get_google_event_id().is_none());
        assert!(!shoot.has_unpushed_changes());
        assert!(Uuid::parse_str(&shoot.get_id()).is_ok());
    }

    #[test]
    fn test_edit_after_sync_needs_push() {
        let mut shoot = sample_shoot();
        let synced = shoot.get_updated_at();
        shoot.link_event("evt1".to_string(), synced);
        assert!(!shoot.has_unpushed_changes());

        shoot.set_updated_at(synced + Duration::seconds(5));
        assert!(shoot.has_unpushed_changes());

        shoot.mark_synced(synced + Duration::seconds(5));
        assert!(!shoot.has_unpushed_changes());
    }

    #[test]
    fn test_touching_intervals_do_not_overlap() {
        let shoot = sample_shoot();
        let end = shoot.get_ends_at();

        assert!(!shoot.overlaps(end, end + Duration::hours(1)));
        assert!(shoot.overlaps(end - Duration::minutes(1), end + Duration::hours(1)));
    }

    #[test]
    fn test_unlink_clears_sync_marker() {
        let mut shoot = sample_shoot();
        shoot.link_event("evt1".to_string(), Utc::now());
        shoot.unlink_event();

        assert!(shoot.get_google_event_id().is_none());
        assert!(shoot.get_calendar_synced_at().is_none());
    }
}
