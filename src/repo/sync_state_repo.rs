use crate::db::DbPool;
use crate::models::CalendarSyncState;
use crate::schema::calendar_sync_states;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use anyhow::Result;
use tracing::{instrument, debug, info, warn};

/// Retrieves the user's sync bookkeeping row
#[instrument(skip(pool), fields(user_id = %user_id))]
pub fn get_sync_state(pool: &DbPool, user_id: &str) -> Result<Option<CalendarSyncState>> {
    let conn = &mut pool.get()?;

    let result = calendar_sync_states::table
        .filter(calendar_sync_states::user_id.eq(user_id))
        .first::<CalendarSyncState>(conn)
        .optional()?;

    debug!("Sync state found: {}", result.is_some());
    Ok(result)
}

/// Loads the row for update, or a fresh one when the user has never synced
fn load_or_new(conn: &mut SqliteConnection, user_id: &str, calendar_id: &str) -> Result<(CalendarSyncState, bool)> {
    let existing = calendar_sync_states::table
        .filter(calendar_sync_states::user_id.eq(user_id))
        .first::<CalendarSyncState>(conn)
        .optional()?;

    Ok(match existing {
        Some(mut state) => {
            state.set_calendar_id(calendar_id.to_string());
            (state, true)
        }
        None => (CalendarSyncState::new(user_id.to_string(), calendar_id.to_string()), false),
    })
}

fn save(conn: &mut SqliteConnection, state: &CalendarSyncState, exists: bool) -> Result<()> {
    if exists {
        diesel::update(calendar_sync_states::table.filter(calendar_sync_states::user_id.eq(state.get_user_id())))
            .set(state)
            .execute(conn)?;
    } else {
        diesel::insert_into(calendar_sync_states::table)
            .values(state)
            .execute(conn)?;
    }
    Ok(())
}

/// Records a completed sync run
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `user_id` - The user whose calendar was synced
/// * `calendar_id` - The calendar that was synced
/// * `sync_token` - The cursor for the next incremental run
/// * `at` - When the run finished
/// * `full` - Whether the run was a full window sync
///
/// ### Returns
///
/// The stored sync state, with any previous error cleared
#[instrument(skip(pool, sync_token), fields(user_id = %user_id, full = full))]
pub fn record_sync_success(
    pool: &DbPool,
    user_id: &str,
    calendar_id: &str,
    sync_token: Option<String>,
    at: DateTime<Utc>,
    full: bool,
) -> Result<CalendarSyncState> {
    let conn = &mut pool.get()?;

    let state = conn.transaction::<_, anyhow::Error, _>(|conn| {
        let (mut state, exists) = load_or_new(conn, user_id, calendar_id)?;
        state.mark_success(at, full, sync_token);
        save(conn, &state, exists)?;
        Ok(state)
    })?;

    info!("Recorded successful sync");
    Ok(state)
}

/// Records a failed sync run, keeping the existing sync token
#[instrument(skip(pool), fields(user_id = %user_id))]
pub fn record_sync_failure(pool: &DbPool, user_id: &str, calendar_id: &str, error: &str) -> Result<()> {
    let conn = &mut pool.get()?;

    conn.transaction::<_, anyhow::Error, _>(|conn| {
        let (mut state, exists) = load_or_new(conn, user_id, calendar_id)?;
        state.mark_failure(error.to_string());
        save(conn, &state, exists)
    })?;

    warn!("Recorded failed sync: {}", error);
    Ok(())
}

/// Forgets the stored sync token so the next run is a full sync
#[instrument(skip(pool), fields(user_id = %user_id))]
pub fn clear_sync_token(pool: &DbPool, user_id: &str) -> Result<()> {
    let conn = &mut pool.get()?;

    diesel::update(calendar_sync_states::table.filter(calendar_sync_states::user_id.eq(user_id)))
        .set((
            calendar_sync_states::sync_token.eq(None::<String>),
            calendar_sync_states::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)?;

    info!("Cleared sync token");
    Ok(())
}

/// Deletes the user's sync bookkeeping
#[instrument(skip(pool), fields(user_id = %user_id))]
pub fn delete_sync_state(pool: &DbPool, user_id: &str) -> Result<()> {
    let conn = &mut pool.get()?;

    diesel::delete(calendar_sync_states::table.filter(calendar_sync_states::user_id.eq(user_id)))
        .execute(conn)?;

    info!("Deleted sync state");
    Ok(())
}

#[cfg(test)]
mod tests;
