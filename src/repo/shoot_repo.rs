use crate::db::DbPool;
use crate::dto::{ShootQuery, UpdateShootDto};
use crate::models::{PendingEventDeletion, Shoot, ShootStatus};
use crate::schema::{clients, pending_event_deletions, shoots};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use anyhow::Result;
use tracing::{instrument, debug, info, warn};

use super::RepoError;

/// Checks that a schedule is a non-empty, forward interval
pub fn validate_schedule(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Result<()> {
    if starts_at >= ends_at {
        return Err(RepoError::Invalid("Shoot must end after it starts".to_string()).into());
    }
    Ok(())
}

fn ensure_client_owned(conn: &mut SqliteConnection, user_id: &str, client_id: &str) -> Result<()> {
    let owned = clients::table
        .filter(clients::id.eq(client_id))
        .filter(clients::user_id.eq(user_id))
        .count()
        .get_result::<i64>(conn)?;
    if owned == 0 {
        return Err(RepoError::Invalid(format!("Unknown client: {}", client_id)).into());
    }
    Ok(())
}

/// Creates a new scheduled shoot
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `user_id` - The owning user
/// * `client_id` - One of the user's clients
/// * `title` - The shoot title, also used as the calendar event summary
/// * `location` - Optional location
/// * `notes` - Optional notes, used as the calendar event description
/// * `starts_at` - Start of the shoot
/// * `ends_at` - End of the shoot, strictly after `starts_at`
///
/// ### Returns
///
/// A Result containing the newly created Shoot if successful
///
/// ### Errors
///
/// Returns `RepoError::Invalid` if the schedule is empty or backwards, the
/// title is blank, or the client does not belong to the user.
#[allow(clippy::too_many_arguments)]
#[instrument(skip(pool, location, notes), fields(user_id = %user_id, client_id = %client_id, title = %title))]
pub fn create_shoot(
    pool: &DbPool,
    user_id: &str,
    client_id: &str,
    title: String,
    location: Option<String>,
    notes: Option<String>,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
) -> Result<Shoot> {
    validate_schedule(starts_at, ends_at)?;
    if title.trim().is_empty() {
        return Err(RepoError::Invalid("Shoot title must not be empty".to_string()).into());
    }

    let conn = &mut pool.get()?;
    ensure_client_owned(conn, user_id, client_id)?;

    let new_shoot = Shoot::new(
        user_id.to_string(),
        client_id.to_string(),
        title,
        location,
        notes,
        starts_at,
        ends_at,
    );
    diesel::insert_into(shoots::table)
        .values(&new_shoot)
        .execute(conn)?;

    info!("Created shoot with id: {}", new_shoot.get_id());
    Ok(new_shoot)
}

/// Retrieves one of the user's shoots by id
#[instrument(skip(pool), fields(user_id = %user_id, shoot_id = %shoot_id))]
pub fn get_shoot(pool: &DbPool, user_id: &str, shoot_id: &str) -> Result<Option<Shoot>> {
    let conn = &mut pool.get()?;

    let result = shoots::table
        .filter(shoots::id.eq(shoot_id))
        .filter(shoots::user_id.eq(user_id))
        .first::<Shoot>(conn)
        .optional()?;

    debug!("Shoot found: {}", result.is_some());
    Ok(result)
}

/// Lists the user's shoots matching the query, ordered by start time
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `user_id` - The owning user
/// * `query` - Optional filters: client, any-of statuses, and a start-time range
///
/// ### Returns
///
/// A Result containing the matching shoots
#[instrument(skip(pool), fields(user_id = %user_id, query = %query))]
pub fn list_shoots(pool: &DbPool, user_id: &str, query: &ShootQuery) -> Result<Vec<Shoot>> {
    let conn = &mut pool.get()?;

    let mut shoot_query = shoots::table
        .filter(shoots::user_id.eq(user_id))
        .into_boxed();

    if let Some(client_id) = &query.client_id {
        shoot_query = shoot_query.filter(shoots::client_id.eq(client_id));
    }

    if !query.statuses.is_empty() {
        let statuses: Vec<&str> = query.statuses.iter().map(|s| s.as_str()).collect();
        shoot_query = shoot_query.filter(shoots::status.eq_any(statuses));
    }

    if let Some(after) = query.starts_after {
        shoot_query = shoot_query.filter(shoots::starts_at.ge(after.naive_utc()));
    }

    if let Some(before) = query.starts_before {
        shoot_query = shoot_query.filter(shoots::starts_at.lt(before.naive_utc()));
    }

    let results = shoot_query
        .order(shoots::starts_at.asc())
        .load::<Shoot>(conn)?;

    debug!("Retrieved {} shoots matching filters", results.len());
    Ok(results)
}

/// Applies a partial update to one of the user's shoots
///
/// The merged schedule is validated as a whole, so moving only one end of
/// the interval past the other is rejected.
///
/// ### Errors
///
/// Returns `RepoError::NotFound` when the shoot does not exist for this user
/// and `RepoError::Invalid` for a bad schedule, blank title or foreign client.
#[instrument(skip(pool, update), fields(user_id = %user_id, shoot_id = %shoot_id))]
pub fn update_shoot(pool: &DbPool, user_id: &str, shoot_id: &str, update: &UpdateShootDto) -> Result<Shoot> {
    let mut shoot = get_shoot(pool, user_id, shoot_id)?.ok_or(RepoError::NotFound)?;

    let conn = &mut pool.get()?;

    if let Some(client_id) = &update.client_id {
        ensure_client_owned(conn, user_id, client_id)?;
        shoot.set_client_id(client_id.clone());
    }
    if let Some(title) = &update.title {
        if title.trim().is_empty() {
            return Err(RepoError::Invalid("Shoot title must not be empty".to_string()).into());
        }
        shoot.set_title(title.clone());
    }
    if update.location.is_some() {
        shoot.set_location(update.location.clone());
    }
    if update.notes.is_some() {
        shoot.set_notes(update.notes.clone());
    }
    if let Some(status) = update.status {
        shoot.set_status(status);
    }

    let starts_at = update.starts_at.unwrap_or_else(|| shoot.get_starts_at());
    let ends_at = update.ends_at.unwrap_or_else(|| shoot.get_ends_at());
    validate_schedule(starts_at, ends_at)?;
    shoot.set_schedule(starts_at, ends_at);

    // A client change never reaches the event, so a pushed shoot stays pushed
    let was_pushed = shoot.get_google_event_id().is_some() && !shoot.has_unpushed_changes();
    shoot.touch();
    if was_pushed && !update.touches_calendar() {
        shoot.mark_synced(shoot.get_updated_at());
    }

    diesel::update(shoots::table.filter(shoots::id.eq(shoot_id)))
        .set(&shoot)
        .execute(conn)?;

    info!("Updated shoot {}", shoot_id);
    Ok(shoot)
}

/// Deletes one of the user's shoots along with its post ideas
///
/// A linked shoot leaves its event queued in `pending_event_deletions`,
/// written in the same transaction, so the event is removed remotely even
/// if the immediate delete fails or never runs.
///
/// ### Returns
///
/// The deleted shoot, so the caller can clean up its calendar event
#[instrument(skip(pool), fields(user_id = %user_id, shoot_id = %shoot_id))]
pub fn delete_shoot(pool: &DbPool, user_id: &str, shoot_id: &str) -> Result<Shoot> {
    let shoot = get_shoot(pool, user_id, shoot_id)?.ok_or(RepoError::NotFound)?;

    let conn = &mut pool.get()?;
    conn.transaction::<_, anyhow::Error, _>(|conn| {
        diesel::delete(shoots::table.filter(shoots::id.eq(shoot_id))).execute(conn)?;
        if let Some(event_id) = shoot.get_google_event_id() {
            let deletion = PendingEventDeletion::new(user_id.to_string(), event_id, shoot_id.to_string());
            diesel::insert_or_ignore_into(pending_event_deletions::table)
                .values(&deletion)
                .execute(conn)?;
        }
        Ok(())
    })?;

    info!("Deleted shoot {}", shoot_id);
    Ok(shoot)
}

/// Whether a shoot with this id exists for any user
#[instrument(skip(pool), fields(shoot_id = %shoot_id))]
pub fn shoot_exists(pool: &DbPool, shoot_id: &str) -> Result<bool> {
    let conn = &mut pool.get()?;

    let count: i64 = shoots::table
        .filter(shoots::id.eq(shoot_id))
        .count()
        .get_result(conn)?;

    Ok(count > 0)
}

/// Lists the user's shoots overlapping `[start, end)`, in any status
#[instrument(skip(pool), fields(user_id = %user_id))]
pub fn list_shoots_in_window(
    pool: &DbPool,
    user_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Shoot>> {
    let conn = &mut pool.get()?;

    let results = shoots::table
        .filter(shoots::user_id.eq(user_id))
        .filter(shoots::starts_at.lt(end.naive_utc()))
        .filter(shoots::ends_at.gt(start.naive_utc()))
        .order(shoots::starts_at.asc())
        .load::<Shoot>(conn)?;

    debug!("Retrieved {} shoots in window", results.len());
    Ok(results)
}

/// Lists the user's shoots in the window that the calendar has not seen yet
///
/// That is scheduled shoots with no event, plus linked shoots edited since
/// their last push.
#[instrument(skip(pool), fields(user_id = %user_id))]
pub fn list_shoots_needing_push(
    pool: &DbPool,
    user_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Shoot>> {
    let mut shoots = list_shoots_in_window(pool, user_id, start, end)?;
    shoots.retain(|shoot| match shoot.get_google_event_id() {
        None => shoot.get_status() == ShootStatus::Scheduled,
        Some(_) => shoot.has_unpushed_changes(),
    });

    debug!("{} shoots need pushing", shoots.len());
    Ok(shoots)
}

/// Finds the user's shoot linked to a calendar event
#[instrument(skip(pool), fields(user_id = %user_id, google_event_id = %google_event_id))]
pub fn get_shoot_by_event_id(pool: &DbPool, user_id: &str, google_event_id: &str) -> Result<Option<Shoot>> {
    let conn = &mut pool.get()?;

    let result = shoots::table
        .filter(shoots::user_id.eq(user_id))
        .filter(shoots::google_event_id.eq(google_event_id))
        .first::<Shoot>(conn)
        .optional()?;

    Ok(result)
}

/// Records that a shoot is represented by the given calendar event
///
/// Also stamps the shoot as synced at `synced_at`, so it is not pushed again
/// until it is next edited.
#[instrument(skip(pool), fields(shoot_id = %shoot_id, google_event_id = %google_event_id))]
pub fn link_shoot_to_event(
    pool: &DbPool,
    shoot_id: &str,
    google_event_id: &str,
    synced_at: DateTime<Utc>,
) -> Result<()> {
    let conn = &mut pool.get()?;

    let updated = diesel::update(shoots::table.filter(shoots::id.eq(shoot_id)))
        .set((
            shoots::google_event_id.eq(Some(google_event_id)),
            shoots::calendar_synced_at.eq(Some(synced_at.naive_utc())),
        ))
        .execute(conn)?;
    if updated == 0 {
        return Err(RepoError::NotFound.into());
    }

    info!("Linked shoot to calendar event");
    Ok(())
}

/// Stamps a linked shoot as pushed at `synced_at`
#[instrument(skip(pool), fields(shoot_id = %shoot_id))]
pub fn mark_shoot_synced(pool: &DbPool, shoot_id: &str, synced_at: DateTime<Utc>) -> Result<()> {
    let conn = &mut pool.get()?;

    diesel::update(shoots::table.filter(shoots::id.eq(shoot_id)))
        .set(shoots::calendar_synced_at.eq(Some(synced_at.naive_utc())))
        .execute(conn)?;

    debug!("Marked shoot as synced");
    Ok(())
}

/// Detaches a shoot from its calendar event
///
/// When `status` is given the shoot also moves to that status; the remote
/// side uses this to cancel shoots whose event was cancelled.
#[instrument(skip(pool), fields(shoot_id = %shoot_id))]
pub fn unlink_shoot_event(pool: &DbPool, shoot_id: &str, status: Option<ShootStatus>) -> Result<()> {
    let conn = &mut pool.get()?;

    let target = shoots::table.filter(shoots::id.eq(shoot_id));
    let updated = match status {
        Some(status) => diesel::update(target)
            .set((
                shoots::google_event_id.eq(None::<String>),
                shoots::calendar_synced_at.eq(None::<chrono::NaiveDateTime>),
                shoots::status.eq(status.as_str()),
                shoots::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)?,
        None => diesel::update(target)
            .set((
                shoots::google_event_id.eq(None::<String>),
                shoots::calendar_synced_at.eq(None::<chrono::NaiveDateTime>),
            ))
            .execute(conn)?,
    };

    if updated == 0 {
        warn!("Shoot to unlink no longer exists");
    } else {
        info!("Unlinked shoot from its calendar event");
    }
    Ok(())
}

/// Detaches every shoot of the user from its calendar event
///
/// Used when the calendar is disconnected, so a later connection starts
/// from unlinked shoots and pushes them again.
#[instrument(skip(pool), fields(user_id = %user_id))]
pub fn unlink_all_shoots_for_user(pool: &DbPool, user_id: &str) -> Result<usize> {
    let conn = &mut pool.get()?;

    let updated = diesel::update(
        shoots::table
            .filter(shoots::user_id.eq(user_id))
            .filter(shoots::google_event_id.is_not_null()),
    )
    .set((
        shoots::google_event_id.eq(None::<String>),
        shoots::calendar_synced_at.eq(None::<chrono::NaiveDateTime>),
    ))
    .execute(conn)?;

    info!("Unlinked {} shoots", updated);
    Ok(updated)
}

/// Overwrites a shoot's title and schedule with values edited remotely
///
/// `updated_at` takes the remote modification time and the shoot is stamped
/// as synced, so the change is neither pushed back nor applied twice.
///
/// ### Errors
///
/// Returns `RepoError::Invalid` when the remote interval is empty or backwards.
#[instrument(skip(pool, title), fields(shoot_id = %shoot_id))]
pub fn apply_remote_schedule(
    pool: &DbPool,
    shoot_id: &str,
    title: &str,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    remote_updated_at: DateTime<Utc>,
) -> Result<()> {
    validate_schedule(starts_at, ends_at)?;

    let conn = &mut pool.get()?;
    let synced_at = Utc::now().max(remote_updated_at);

    diesel::update(shoots::table.filter(shoots::id.eq(shoot_id)))
        .set((
            shoots::title.eq(title),
            shoots::starts_at.eq(starts_at.naive_utc()),
            shoots::ends_at.eq(ends_at.naive_utc()),
            shoots::updated_at.eq(remote_updated_at.naive_utc()),
            shoots::calendar_synced_at.eq(Some(synced_at.naive_utc())),
        ))
        .execute(conn)?;

    info!("Applied remote schedule to shoot");
    Ok(())
}
