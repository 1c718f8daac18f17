use crate::db::DbPool;
use crate::models::Client;
use crate::schema::{clients, shoots};
use diesel::prelude::*;
use anyhow::Result;
use tracing::{instrument, debug, info};

use super::RepoError;

/// Creates a new client owned by the given user
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `user_id` - The owning user
/// * `name` - The client's name
/// * `contact_email` - Optional contact address
/// * `notes` - Optional free-form notes
///
/// ### Returns
///
/// A Result containing the newly created Client if successful
///
/// ### Errors
///
/// Returns an error if the name is blank or the insert fails
#[instrument(skip(pool, notes), fields(user_id = %user_id, name = %name))]
pub fn create_client(
    pool: &DbPool,
    user_id: &str,
    name: String,
    contact_email: Option<String>,
    notes: Option<String>,
) -> Result<Client> {
    if name.trim().is_empty() {
        return Err(RepoError::Invalid("Client name must not be empty".to_string()).into());
    }

    let conn = &mut pool.get()?;

    let new_client = Client::new(user_id.to_string(), name, contact_email, notes);
    diesel::insert_into(clients::table)
        .values(&new_client)
        .execute(conn)?;

    info!("Created client with id: {}", new_client.get_id());
    Ok(new_client)
}

/// Retrieves one of the user's clients by id
///
/// A client owned by someone else is reported as not found.
#[instrument(skip(pool), fields(user_id = %user_id, client_id = %client_id))]
pub fn get_client(pool: &DbPool, user_id: &str, client_id: &str) -> Result<Option<Client>> {
    let conn = &mut pool.get()?;

    let result = clients::table
        .filter(clients::id.eq(client_id))
        .filter(clients::user_id.eq(user_id))
        .first::<Client>(conn)
        .optional()?;

    debug!("Client found: {}", result.is_some());
    Ok(result)
}

/// Lists the user's clients ordered by name
#[instrument(skip(pool), fields(user_id = %user_id))]
pub fn list_clients_for_user(pool: &DbPool, user_id: &str) -> Result<Vec<Client>> {
    let conn = &mut pool.get()?;

    let result = clients::table
        .filter(clients::user_id.eq(user_id))
        .order(clients::name.asc())
        .load::<Client>(conn)?;

    debug!("Retrieved {} clients", result.len());
    Ok(result)
}

/// Applies a partial update to one of the user's clients
///
/// Fields passed as `None` are left as they are.
///
/// ### Errors
///
/// Returns `RepoError::NotFound` when the client does not exist for this user
/// and `RepoError::Invalid` when the new name is blank.
#[instrument(skip(pool, notes), fields(user_id = %user_id, client_id = %client_id))]
pub fn update_client(
    pool: &DbPool,
    user_id: &str,
    client_id: &str,
    name: Option<String>,
    contact_email: Option<String>,
    notes: Option<String>,
) -> Result<Client> {
    let mut client = get_client(pool, user_id, client_id)?.ok_or(RepoError::NotFound)?;

    if let Some(name) = name {
        if name.trim().is_empty() {
            return Err(RepoError::Invalid("Client name must not be empty".to_string()).into());
        }
        client.set_name(name);
    }
    if contact_email.is_some() {
        client.set_contact_email(contact_email);
    }
    if notes.is_some() {
        client.set_notes(notes);
    }
    client.touch();

    let conn = &mut pool.get()?;
    diesel::update(clients::table.filter(clients::id.eq(client_id)))
        .set(&client)
        .execute(conn)?;

    info!("Updated client {}", client_id);
    Ok(client)
}

/// Deletes one of the user's clients
///
/// ### Errors
///
/// Returns `RepoError::NotFound` when the client does not exist for this user
/// and `RepoError::InUse` while any shoot still references it.
#[instrument(skip(pool), fields(user_id = %user_id, client_id = %client_id))]
pub fn delete_client(pool: &DbPool, user_id: &str, client_id: &str) -> Result<()> {
    let conn = &mut pool.get()?;

    conn.transaction::<_, anyhow::Error, _>(|conn| {
        let exists = clients::table
            .filter(clients::id.eq(client_id))
            .filter(clients::user_id.eq(user_id))
            .count()
            .get_result::<i64>(conn)?;
        if exists == 0 {
            return Err(RepoError::NotFound.into());
        }

        let shoot_count = shoots::table
            .filter(shoots::client_id.eq(client_id))
            .count()
            .get_result::<i64>(conn)?;
        if shoot_count > 0 {
            return Err(RepoError::InUse(format!(
                "Client still has {} shoot(s); delete or reassign them first",
                shoot_count
            ))
            .into());
        }

        diesel::delete(clients::table.filter(clients::id.eq(client_id))).execute(conn)?;
        Ok(())
    })?;

    info!("Deleted client {}", client_id);
    Ok(())
}
