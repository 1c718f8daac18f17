use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{instrument, debug, info};

use crate::auth::{CurrentUser, RequireWriter};
use crate::db::DbPool;
use crate::dto::{CreateClientDto, UpdateClientDto};
use crate::errors::ApiError;
use crate::models::Client;
use crate::repo;

/// Handler for creating a new client
///
/// This function handles POST requests to `/clients`.
///
/// ### Arguments
///
/// * `pool` - The database connection pool
/// * `user` - The signed-in user, who will own the client
/// * `payload` - The client's name and contact details
///
/// ### Returns
///
/// The newly created client as JSON
#[instrument(skip(pool, user, payload), fields(user_id = %user.id(), name = %payload.name))]
pub async fn create_client_handler(
    State(pool): State<Arc<DbPool>>,
    RequireWriter(user): RequireWriter,
    Json(payload): Json<CreateClientDto>,
) -> Result<Json<Client>, ApiError> {
    info!("Creating new client");

    let client = repo::create_client(&pool, &user.id(), payload.name, payload.contact_email, payload.notes)?;

    info!("Successfully created client with id: {}", client.get_id());
    Ok(Json(client))
}

/// Handler for listing the user's clients
///
/// This function handles GET requests to `/clients`.
#[instrument(skip(pool, user), fields(user_id = %user.id()))]
pub async fn list_clients_handler(
    State(pool): State<Arc<DbPool>>,
    user: CurrentUser,
) -> Result<Json<Vec<Client>>, ApiError> {
    debug!("Listing clients");

    let clients = repo::list_clients_for_user(&pool, &user.id())?;

    info!("Retrieved {} clients", clients.len());
    Ok(Json(clients))
}

/// Handler for getting a client by id
///
/// This function handles GET requests to `/clients/{id}`.
///
/// ### Returns
///
/// The client as JSON, or 404 when it does not exist or belongs to
/// another user
#[instrument(skip(pool, user), fields(user_id = %user.id(), client_id = %client_id))]
pub async fn get_client_handler(
    State(pool): State<Arc<DbPool>>,
    user: CurrentUser,
    Path(client_id): Path<String>,
) -> Result<Json<Client>, ApiError> {
    debug!("Getting client");

    let client = repo::get_client(&pool, &user.id(), &client_id)?.ok_or(ApiError::NotFound)?;

    Ok(Json(client))
}

/// Handler for partially updating a client
///
/// This function handles PATCH requests to `/clients/{id}`.
#[instrument(skip(pool, user, payload), fields(user_id = %user.id(), client_id = %client_id))]
pub async fn update_client_handler(
    State(pool): State<Arc<DbPool>>,
    RequireWriter(user): RequireWriter,
    Path(client_id): Path<String>,
    Json(payload): Json<UpdateClientDto>,
) -> Result<Json<Client>, ApiError> {
    info!("Updating client");

    let client = repo::update_client(
        &pool,
        &user.id(),
        &client_id,
        payload.name,
        payload.contact_email,
        payload.notes,
    )?;

    Ok(Json(client))
}

/// Handler for deleting a client
///
/// This function handles DELETE requests to `/clients/{id}`. Clients that
/// still have shoots are refused with 409.
#[instrument(skip(pool, user), fields(user_id = %user.id(), client_id = %client_id))]
pub async fn delete_client_handler(
    State(pool): State<Arc<DbPool>>,
    RequireWriter(user): RequireWriter,
    Path(client_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    info!("Deleting client");

    repo::delete_client(&pool, &user.id(), &client_id)?;

    Ok(StatusCode::NO_CONTENT)
}
