//! Pure planning for one sync run.
//!
//! The service loads what it needs from the database and the remote
//! calendar, asks these functions what to do, then applies the answer.
//! Nothing here performs I/O.

use crate::calendar::{EventWrite, RemoteEvent};
use crate::models::{CalendarEvent, Shoot, ShootStatus};
use chrono::{DateTime, Utc};

/// What happens to the cached copy of a remote event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheChange {
    /// The cached row already holds this revision
    Unchanged,
    Create,
    Update,
    /// The event was cancelled and a cached row exists
    Remove,
    /// The event was cancelled and was never cached
    Absent,
}

/// What happens to the shoot linked to a remote event
#[derive(Debug, Clone, PartialEq)]
pub enum ShootChange {
    None,
    /// The shoot is found through the event's `shootId` property but its link
    /// was never stored, typically after a push that failed halfway
    Link { shoot_id: String },
    /// The event was edited remotely after the shoot was last edited locally
    ApplyRemote {
        shoot_id: String,
        title: String,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        remote_updated_at: DateTime<Utc>,
        link: bool,
    },
    /// The event was cancelled or deleted remotely
    Cancel { shoot_id: String },
}

/// The plan for one pulled event
#[derive(Debug, Clone, PartialEq)]
pub struct PullStep {
    pub cache: CacheChange,
    pub shoot: ShootChange,
}

impl PullStep {
    /// Whether applying this step changes anything
    pub fn is_noop(&self) -> bool {
        matches!(self.cache, CacheChange::Unchanged | CacheChange::Absent) && self.shoot == ShootChange::None
    }
}

/// Decides how one pulled event is reconciled
///
/// ### Arguments
///
/// * `event` - The event as listed by the calendar
/// * `cached` - The locally cached copy, if any
/// * `shoot` - The shoot linked to the event, found either by its stored
///   event id or by the event's `shootId` private property
///
/// ### Returns
///
/// The changes to make to the cache and to the shoot. Remote edits only
/// reach the shoot when they are newer than its last local edit; otherwise
/// the push phase sends the local version instead.
pub fn plan_pull(event: &RemoteEvent, cached: Option<&CalendarEvent>, shoot: Option<&Shoot>) -> PullStep {
    let linked_here = shoot
        .map(|s| s.get_google_event_id().as_deref() == Some(event.id.as_str()))
        .unwrap_or(false);

    if event.is_cancelled() || event.span().is_none() {
        let cache = if cached.is_some() { CacheChange::Remove } else { CacheChange::Absent };
        let shoot = match shoot {
            Some(s) if linked_here => ShootChange::Cancel { shoot_id: s.get_id() },
            _ => ShootChange::None,
        };
        return PullStep { cache, shoot };
    }

    let cache = match cached {
        None => CacheChange::Create,
        Some(row) if row.matches_revision(event.etag.as_deref(), event.updated) => CacheChange::Unchanged,
        Some(_) => CacheChange::Update,
    };

    let shoot = match shoot {
        None => ShootChange::None,
        Some(s) => plan_shoot_change(event, s, linked_here),
    };

    PullStep { cache, shoot }
}

/// Whether a live remote event belongs to a shoot that was deleted locally
///
/// That is the case when the deletion is already queued, or when the
/// event's `shootId` property names a shoot that no longer exists. Such an
/// event is removed on the provider instead of being cached as a foreign
/// booking.
pub fn is_orphaned(event: &RemoteEvent, deletion_pending: bool, owner_exists: Option<bool>) -> bool {
    if event.is_cancelled() {
        return false;
    }
    deletion_pending || owner_exists == Some(false)
}

fn plan_shoot_change(event: &RemoteEvent, shoot: &Shoot, linked_here: bool) -> ShootChange {
    // A shoot already linked to a different event keeps that link
    if shoot.get_google_event_id().is_some() && !linked_here {
        return ShootChange::None;
    }

    let link = !linked_here;
    let remote_is_newer = event.updated > shoot.get_updated_at();

    if let (Some((start, end)), false) = (event.span(), event.all_day) {
        let differs = event.summary != shoot.get_title()
            || start != shoot.get_starts_at()
            || end != shoot.get_ends_at();
        if remote_is_newer && differs && start < end {
            return ShootChange::ApplyRemote {
                shoot_id: shoot.get_id(),
                title: event.summary.clone(),
                starts_at: start,
                ends_at: end,
                remote_updated_at: event.updated,
                link,
            };
        }
    }

    if link {
        ShootChange::Link { shoot_id: shoot.get_id() }
    } else {
        ShootChange::None
    }
}

/// Builds the cache row for a pulled or pushed event
pub fn cache_row(user_id: &str, event: &RemoteEvent, shoot_id: Option<String>) -> Option<CalendarEvent> {
    let (start, end) = event.span()?;
    Some(CalendarEvent::new(
        user_id.to_string(),
        event.id.clone(),
        event.summary.clone(),
        start,
        end,
        event.all_day,
        event.status.as_str().to_string(),
        event.etag.clone(),
        event.updated,
        shoot_id,
    ))
}

/// A local change to send to the calendar
#[derive(Debug, Clone, PartialEq)]
pub enum PushAction {
    /// A scheduled shoot with no event yet
    Insert { shoot_id: String, event: EventWrite },
    /// A linked shoot edited since its last push
    Patch { shoot_id: String, event_id: String, event: EventWrite },
    /// A linked shoot that was cancelled locally
    Delete { shoot_id: String, event_id: String },
}

impl PushAction {
    pub fn shoot_id(&self) -> &str {
        match self {
            PushAction::Insert { shoot_id, .. }
            | PushAction::Patch { shoot_id, .. }
            | PushAction::Delete { shoot_id, .. } => shoot_id,
        }
    }
}

/// The event body that represents a shoot
pub fn event_write_for(shoot: &Shoot) -> EventWrite {
    EventWrite {
        summary: shoot.get_title(),
        description: shoot.get_notes(),
        location: shoot.get_location(),
        start: shoot.get_starts_at(),
        end: shoot.get_ends_at(),
        shoot_id: shoot.get_id(),
    }
}

/// Decides what, if anything, to send for one shoot
///
/// Unlinked shoots are inserted only while scheduled; a cancelled or
/// completed shoot that never reached the calendar stays local.
pub fn push_action_for(shoot: &Shoot) -> Option<PushAction> {
    match (shoot.get_google_event_id(), shoot.get_status()) {
        (None, ShootStatus::Scheduled) => Some(PushAction::Insert {
            shoot_id: shoot.get_id(),
            event: event_write_for(shoot),
        }),
        (None, _) => None,
        (Some(event_id), ShootStatus::Cancelled) => Some(PushAction::Delete {
            shoot_id: shoot.get_id(),
            event_id,
        }),
        (Some(event_id), _) if shoot.has_unpushed_changes() => Some(PushAction::Patch {
            shoot_id: shoot.get_id(),
            event_id,
            event: event_write_for(shoot),
        }),
        (Some(_), _) => None,
    }
}

/// Plans the push phase for the shoots the repository reported as pending
pub fn plan_push(shoots: &[Shoot]) -> Vec<PushAction> {
    shoots.iter().filter_map(push_action_for).collect()
}
