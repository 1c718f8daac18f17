use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::Query;
use std::sync::Arc;
use tracing::{instrument, debug, info, warn};

use crate::auth::{CurrentUser, RequireWriter};
use crate::db::DbPool;
use crate::dto::{CreateShootDto, ShootQuery, UpdateShootDto};
use crate::errors::ApiError;
use crate::models::Shoot;
use crate::repo;
use crate::sync::GoogleCalendarSync;

/// Pushes a written shoot to the calendar when write-through is enabled
///
/// Failures are logged only; the shoot stays marked as unpushed and the
/// next sync run picks it up.
async fn write_through(pool: &DbPool, sync: &GoogleCalendarSync, shoot: Shoot) -> Result<Shoot, ApiError> {
    if !sync.settings().push_on_write {
        return Ok(shoot);
    }
    if let Err(err) = sync.push_shoot(&shoot).await {
        warn!(shoot_id = %shoot.get_id(), "Write-through push failed: {}", err);
        return Ok(shoot);
    }

    // Pick up the event link stored by the push
    let refreshed = repo::get_shoot(pool, &shoot.get_user_id(), &shoot.get_id())?;
    Ok(refreshed.unwrap_or(shoot))
}

/// Handler for creating a new shoot
///
/// This function handles POST requests to `/shoots`.
///
/// ### Arguments
///
/// * `pool` - The database connection pool
/// * `sync` - The calendar sync service, for write-through
/// * `user` - The signed-in user, who will own the shoot
/// * `payload` - The shoot's client, title and schedule
///
/// ### Returns
///
/// The newly created shoot as JSON
#[instrument(skip(pool, sync, user, payload), fields(user_id = %user.id(), client_id = %payload.client_id))]
pub async fn create_shoot_handler(
    State(pool): State<Arc<DbPool>>,
    State(sync): State<GoogleCalendarSync>,
    RequireWriter(user): RequireWriter,
    Json(payload): Json<CreateShootDto>,
) -> Result<Json<Shoot>, ApiError> {
    info!("Creating new shoot");

    let shoot = repo::create_shoot(
        &pool,
        &user.id(),
        &payload.client_id,
        payload.title,
        payload.location,
        payload.notes,
        payload.starts_at,
        payload.ends_at,
    )?;
    info!("Successfully created shoot with id: {}", shoot.get_id());

    let shoot = write_through(&pool, &sync, shoot).await?;
    Ok(Json(shoot))
}

/// Handler for listing shoots with optional filters
///
/// This function handles GET requests to `/shoots`.
///
/// ### Arguments
///
/// * `pool` - The database connection pool
/// * `user` - The signed-in user
/// * `query` - Filters: `client_id`, repeated `statuses`, `starts_after`, `starts_before`
///
/// ### Returns
///
/// The matching shoots, by start time
#[instrument(skip(pool, user), fields(user_id = %user.id(), query = %query))]
pub async fn list_shoots_handler(
    State(pool): State<Arc<DbPool>>,
    user: CurrentUser,
    Query(query): Query<ShootQuery>,
) -> Result<Json<Vec<Shoot>>, ApiError> {
    debug!("Listing shoots");

    let shoots = repo::list_shoots(&pool, &user.id(), &query)?;

    info!("Retrieved {} shoots", shoots.len());
    Ok(Json(shoots))
}

/// Handler for getting a shoot by id
///
/// This function handles GET requests to `/shoots/{id}`.
#[instrument(skip(pool, user), fields(user_id = %user.id(), shoot_id = %shoot_id))]
pub async fn get_shoot_handler(
    State(pool): State<Arc<DbPool>>,
    user: CurrentUser,
    Path(shoot_id): Path<String>,
) -> Result<Json<Shoot>, ApiError> {
    debug!("Getting shoot");

    let shoot = repo::get_shoot(&pool, &user.id(), &shoot_id)?.ok_or(ApiError::NotFound)?;

    Ok(Json(shoot))
}

/// Handler for partially updating a shoot
///
/// This function handles PATCH requests to `/shoots/{id}`. Setting the
/// status to `cancelled` removes the linked calendar event on push.
#[instrument(skip(pool, sync, user, payload), fields(user_id = %user.id(), shoot_id = %shoot_id))]
pub async fn update_shoot_handler(
    State(pool): State<Arc<DbPool>>,
    State(sync): State<GoogleCalendarSync>,
    RequireWriter(user): RequireWriter,
    Path(shoot_id): Path<String>,
    Json(payload): Json<UpdateShootDto>,
) -> Result<Json<Shoot>, ApiError> {
    info!("Updating shoot");

    let shoot = repo::update_shoot(&pool, &user.id(), &shoot_id, &payload)?;

    let shoot = if payload.touches_calendar() {
        write_through(&pool, &sync, shoot).await?
    } else {
        shoot
    };
    Ok(Json(shoot))
}

/// Handler for deleting a shoot
///
/// This function handles DELETE requests to `/shoots/{id}`. The shoot's
/// post ideas go with it, and its calendar event is removed when
/// write-through is enabled.
#[instrument(skip(pool, sync, user), fields(user_id = %user.id(), shoot_id = %shoot_id))]
pub async fn delete_shoot_handler(
    State(pool): State<Arc<DbPool>>,
    State(sync): State<GoogleCalendarSync>,
    RequireWriter(user): RequireWriter,
    Path(shoot_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    info!("Deleting shoot");

    let shoot = repo::delete_shoot(&pool, &user.id(), &shoot_id)?;

    if sync.settings().push_on_write {
        if let Err(err) = sync.remove_shoot_event(&shoot).await {
            warn!("Could not remove calendar event of deleted shoot: {}", err);
        }
    }

    Ok(StatusCode::NO_CONTENT)
}
