//! Scheduling conflict detection over shoots and cached calendar events.

use crate::models::{CalendarEvent, Shoot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingKind {
    Shoot,
    Event,
}

/// Something that occupies time on the user's schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub kind: BookingKind,
    /// Shoot id, or the Google event id for calendar events
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Booking {
    pub fn from_shoot(shoot: &Shoot) -> Self {
        Self {
            kind: BookingKind::Shoot,
            id: shoot.get_id(),
            title: shoot.get_title(),
            start: shoot.get_starts_at(),
            end: shoot.get_ends_at(),
        }
    }

    pub fn from_event(event: &CalendarEvent) -> Self {
        Self {
            kind: BookingKind::Event,
            id: event.get_google_event_id(),
            title: event.get_summary(),
            start: event.get_starts_at(),
            end: event.get_ends_at(),
        }
    }

    /// Half-open overlap: touching bookings do not conflict
    pub fn overlaps(&self, other: &Booking) -> bool {
        overlaps(self.start, self.end, other.start, other.end)
    }
}

/// Whether `[a_start, a_end)` and `[b_start, b_end)` share any instant
pub fn overlaps(a_start: DateTime<Utc>, a_end: DateTime<Utc>, b_start: DateTime<Utc>, b_end: DateTime<Utc>) -> bool {
    a_start < b_end && b_start < a_end
}

/// Two bookings that overlap; `first` starts no later than `second`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub first: Booking,
    pub second: Booking,
}

/// Collects the bookings that take part in conflict detection
///
/// Cancelled shoots free their slot. All-day events are treated as
/// informational. An event mirroring a shoot is that shoot's booking and is
/// dropped so the pair is not reported against itself.
pub fn bookings(shoots: &[Shoot], events: &[CalendarEvent]) -> Vec<Booking> {
    let shoot_ids: std::collections::HashSet<String> = shoots.iter().map(|s| s.get_id()).collect();
    let linked_events: std::collections::HashSet<String> =
        shoots.iter().filter_map(|s| s.get_google_event_id()).collect();

    let mut result: Vec<Booking> = shoots.iter().filter(|s| s.is_active()).map(Booking::from_shoot).collect();

    result.extend(
        events
            .iter()
            .filter(|e| !e.is_all_day())
            .filter(|e| !linked_events.contains(&e.get_google_event_id()))
            .filter(|e| e.get_shoot_id().is_none_or(|id| !shoot_ids.contains(&id)))
            .map(Booking::from_event),
    );
    result
}

fn by_start(a: &Booking, b: &Booking) -> Ordering {
    a.start
        .cmp(&b.start)
        .then(a.end.cmp(&b.end))
        .then(a.kind.cmp(&b.kind))
        .then(a.id.cmp(&b.id))
}

/// Finds every overlapping pair involving at least one shoot
///
/// Bookings are swept in start order while an active list holds those whose
/// end has not yet been passed. Two calendar events overlapping each other
/// are the user's own business and are not reported.
pub fn find_conflicts(shoots: &[Shoot], events: &[CalendarEvent]) -> Vec<Conflict> {
    let mut all = bookings(shoots, events);
    all.sort_by(by_start);

    let mut conflicts = Vec::new();
    let mut active: Vec<Booking> = Vec::new();

    for booking in all {
        active.retain(|open| open.end > booking.start);

        for open in &active {
            let involves_shoot = open.kind == BookingKind::Shoot || booking.kind == BookingKind::Shoot;
            if involves_shoot && open.overlaps(&booking) {
                conflicts.push(Conflict { first: open.clone(), second: booking.clone() });
            }
        }

        active.push(booking);
    }

    conflicts
}

/// Lists the bookings that overlap a proposed slot
///
/// ### Arguments
///
/// * `start` - Start of the proposed slot
/// * `end` - End of the proposed slot
/// * `exclude_shoot_id` - A shoot being rescheduled, which never conflicts with itself
/// * `shoots` - The user's shoots around the slot
/// * `events` - The user's cached calendar events around the slot
///
/// ### Returns
///
/// The overlapping bookings, by start time
pub fn conflicts_for_window(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude_shoot_id: Option<&str>,
    shoots: &[Shoot],
    events: &[CalendarEvent],
) -> Vec<Booking> {
    let candidates: Vec<Shoot> = shoots
        .iter()
        .filter(|s| exclude_shoot_id != Some(s.get_id().as_str()))
        .cloned()
        .collect();

    // Events mirroring the excluded shoot belong to it as well
    let excluded_event = exclude_shoot_id
        .and_then(|id| shoots.iter().find(|s| s.get_id() == id))
        .and_then(|s| s.get_google_event_id());

    let other_events: Vec<CalendarEvent> = events
        .iter()
        .filter(|e| excluded_event.as_deref() != Some(e.get_google_event_id().as_str()))
        .filter(|e| exclude_shoot_id.is_none() || e.get_shoot_id().as_deref() != exclude_shoot_id)
        .cloned()
        .collect();

    let mut result: Vec<Booking> = bookings(&candidates, &other_events)
        .into_iter()
        .filter(|b| overlaps(b.start, b.end, start, end))
        .collect();

    result.sort_by(by_start);
    result
}
