use crate::db::DbPool;
use crate::models::CalendarEvent;
use crate::schema::calendar_events;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use anyhow::Result;
use tracing::{instrument, debug, info};

/// Inserts or replaces the cached copy of a remote event
///
/// Rows are keyed by `(user_id, google_event_id)`; a replaced row keeps its
/// local id.
///
/// ### Returns
///
/// The row as stored and whether it was newly inserted
#[instrument(skip(pool, event), fields(user_id = %event.get_user_id(), google_event_id = %event.get_google_event_id()))]
pub fn upsert_calendar_event(pool: &DbPool, mut event: CalendarEvent) -> Result<(CalendarEvent, bool)> {
    let conn = &mut pool.get()?;

    let created = conn.transaction::<_, anyhow::Error, _>(|conn| {
        let existing_id = calendar_events::table
            .filter(calendar_events::user_id.eq(event.get_user_id()))
            .filter(calendar_events::google_event_id.eq(event.get_google_event_id()))
            .select(calendar_events::id)
            .first::<String>(conn)
            .optional()?;

        match existing_id {
            Some(id) => {
                event.set_id(id.clone());
                diesel::update(calendar_events::table.filter(calendar_events::id.eq(id)))
                    .set(&event)
                    .execute(conn)?;
                Ok(false)
            }
            None => {
                diesel::insert_into(calendar_events::table)
                    .values(&event)
                    .execute(conn)?;
                Ok(true)
            }
        }
    })?;

    debug!("Cached calendar event (created: {})", created);
    Ok((event, created))
}

/// Retrieves the cached copy of a remote event
#[instrument(skip(pool), fields(user_id = %user_id, google_event_id = %google_event_id))]
pub fn get_calendar_event(pool: &DbPool, user_id: &str, google_event_id: &str) -> Result<Option<CalendarEvent>> {
    let conn = &mut pool.get()?;

    let result = calendar_events::table
        .filter(calendar_events::user_id.eq(user_id))
        .filter(calendar_events::google_event_id.eq(google_event_id))
        .first::<CalendarEvent>(conn)
        .optional()?;

    Ok(result)
}

/// Removes the cached copy of a remote event
///
/// ### Returns
///
/// The removed row, if there was one
#[instrument(skip(pool), fields(user_id = %user_id, google_event_id = %google_event_id))]
pub fn delete_calendar_event(pool: &DbPool, user_id: &str, google_event_id: &str) -> Result<Option<CalendarEvent>> {
    let existing = get_calendar_event(pool, user_id, google_event_id)?;
    if existing.is_none() {
        return Ok(None);
    }

    let conn = &mut pool.get()?;
    diesel::delete(
        calendar_events::table
            .filter(calendar_events::user_id.eq(user_id))
            .filter(calendar_events::google_event_id.eq(google_event_id)),
    )
    .execute(conn)?;

    info!("Removed cached calendar event");
    Ok(existing)
}

/// Removes cached events overlapping `[start, end)` whose ids are not in `keep`
///
/// A full sync lists every live event in its window, so anything cached in
/// that window and missing from the listing was deleted remotely. Rows
/// outside the window are left alone.
///
/// ### Returns
///
/// The removed rows, so linked shoots can be detached
#[instrument(skip(pool, keep), fields(user_id = %user_id, keep = keep.len()))]
pub fn delete_calendar_events_not_in(
    pool: &DbPool,
    user_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    keep: &[String],
) -> Result<Vec<CalendarEvent>> {
    let conn = &mut pool.get()?;

    let removed = conn.transaction::<_, anyhow::Error, _>(|conn| {
        let stale = calendar_events::table
            .filter(calendar_events::user_id.eq(user_id))
            .filter(calendar_events::starts_at.lt(end.naive_utc()))
            .filter(calendar_events::ends_at.gt(start.naive_utc()))
            .filter(calendar_events::google_event_id.ne_all(keep))
            .load::<CalendarEvent>(conn)?;

        let stale_ids: Vec<String> = stale.iter().map(|e| e.get_id()).collect();
        diesel::delete(calendar_events::table.filter(calendar_events::id.eq_any(&stale_ids)))
            .execute(conn)?;
        Ok(stale)
    })?;

    info!("Removed {} stale cached events", removed.len());
    Ok(removed)
}

/// Lists the user's cached events overlapping `[start, end)`, by start time
#[instrument(skip(pool), fields(user_id = %user_id))]
pub fn list_calendar_events_in_window(
    pool: &DbPool,
    user_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<CalendarEvent>> {
    let conn = &mut pool.get()?;

    let result = calendar_events::table
        .filter(calendar_events::user_id.eq(user_id))
        .filter(calendar_events::starts_at.lt(end.naive_utc()))
        .filter(calendar_events::ends_at.gt(start.naive_utc()))
        .order(calendar_events::starts_at.asc())
        .load::<CalendarEvent>(conn)?;

    debug!("Retrieved {} cached events", result.len());
    Ok(result)
}

/// Removes every cached event for the user
#[instrument(skip(pool), fields(user_id = %user_id))]
pub fn delete_calendar_events_for_user(pool: &DbPool, user_id: &str) -> Result<usize> {
    let conn = &mut pool.get()?;

    let deleted = diesel::delete(calendar_events::table.filter(calendar_events::user_id.eq(user_id)))
        .execute(conn)?;

    info!("Removed {} cached events", deleted);
    Ok(deleted)
}

#[cfg(test)]
mod tests;
