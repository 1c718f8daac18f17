use crate::db::DbPool;
use crate::models::PendingEventDeletion;
use crate::schema::pending_event_deletions;
use diesel::prelude::*;
use anyhow::Result;
use tracing::{instrument, debug, info};

/// Queues a calendar event for removal on the provider
///
/// Queuing an event twice is harmless.
///
/// ### Returns
///
/// Whether a new entry was written
#[instrument(skip(pool), fields(user_id = %user_id, google_event_id = %google_event_id))]
pub fn queue_event_deletion(pool: &DbPool, user_id: &str, google_event_id: &str, shoot_id: &str) -> Result<bool> {
    let conn = &mut pool.get()?;

    let deletion = PendingEventDeletion::new(
        user_id.to_string(),
        google_event_id.to_string(),
        shoot_id.to_string(),
    );
    let inserted = diesel::insert_or_ignore_into(pending_event_deletions::table)
        .values(&deletion)
        .execute(conn)?;

    if inserted > 0 {
        info!("Queued calendar event for deletion");
    }
    Ok(inserted > 0)
}

/// Whether the event is waiting to be removed on the provider
#[instrument(skip(pool), fields(user_id = %user_id, google_event_id = %google_event_id))]
pub fn is_event_deletion_pending(pool: &DbPool, user_id: &str, google_event_id: &str) -> Result<bool> {
    let conn = &mut pool.get()?;

    let count: i64 = pending_event_deletions::table
        .filter(pending_event_deletions::user_id.eq(user_id))
        .filter(pending_event_deletions::google_event_id.eq(google_event_id))
        .count()
        .get_result(conn)?;

    Ok(count > 0)
}

/// Lists the user's queued deletions, oldest first
#[instrument(skip(pool), fields(user_id = %user_id))]
pub fn list_event_deletions(pool: &DbPool, user_id: &str) -> Result<Vec<PendingEventDeletion>> {
    let conn = &mut pool.get()?;

    let result = pending_event_deletions::table
        .filter(pending_event_deletions::user_id.eq(user_id))
        .order(pending_event_deletions::created_at.asc())
        .load::<PendingEventDeletion>(conn)?;

    debug!("Retrieved {} pending event deletions", result.len());
    Ok(result)
}

/// Drops a queued deletion once the event is gone remotely
#[instrument(skip(pool), fields(user_id = %user_id, google_event_id = %google_event_id))]
pub fn clear_event_deletion(pool: &DbPool, user_id: &str, google_event_id: &str) -> Result<bool> {
    let conn = &mut pool.get()?;

    let deleted = diesel::delete(
        pending_event_deletions::table
            .filter(pending_event_deletions::user_id.eq(user_id))
            .filter(pending_event_deletions::google_event_id.eq(google_event_id)),
    )
    .execute(conn)?;

    debug!("Cleared pending event deletion");
    Ok(deleted > 0)
}

/// Drops every queued deletion for the user
#[instrument(skip(pool), fields(user_id = %user_id))]
pub fn delete_event_deletions_for_user(pool: &DbPool, user_id: &str) -> Result<usize> {
    let conn = &mut pool.get()?;

    let deleted = diesel::delete(pending_event_deletions::table.filter(pending_event_deletions::user_id.eq(user_id)))
        .execute(conn)?;

    info!("Dropped {} pending event deletions", deleted);
    Ok(deleted)
}
