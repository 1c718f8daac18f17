use crate::db::DbPool;
use crate::models::{User, UserRole};
use crate::schema::users;
use diesel::prelude::*;
use anyhow::Result;
use tracing::{instrument, debug, info};

/// Creates a new user in the database
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `email` - The user's email address, unique across users
/// * `name` - The display name
/// * `role` - The user's role
///
/// ### Returns
///
/// A Result containing the newly created User if successful
///
/// ### Errors
///
/// Returns an error if:
/// - Unable to get a connection from the pool
/// - A user with the same email already exists
#[instrument(skip(pool), fields(email = %email, role = %role))]
pub fn create_user(pool: &DbPool, email: String, name: String, role: UserRole) -> Result<User> {
    let conn = &mut pool.get()?;

    let new_user = User::new(email, name, role);
    diesel::insert_into(users::table)
        .values(&new_user)
        .execute(conn)?;

    info!("Created user with id: {}", new_user.get_id());
    Ok(new_user)
}

/// Retrieves a user by id
#[instrument(skip(pool), fields(user_id = %user_id))]
pub fn get_user(pool: &DbPool, user_id: &str) -> Result<Option<User>> {
    let conn = &mut pool.get()?;

    let result = users::table
        .filter(users::id.eq(user_id))
        .first::<User>(conn)
        .optional()?;

    debug!("User found: {}", result.is_some());
    Ok(result)
}

/// Retrieves a user by email address
#[instrument(skip(pool), fields(email = %email))]
pub fn get_user_by_email(pool: &DbPool, email: &str) -> Result<Option<User>> {
    let conn = &mut pool.get()?;

    let result = users::table
        .filter(users::email.eq(email))
        .first::<User>(conn)
        .optional()?;

    debug!("User found: {}", result.is_some());
    Ok(result)
}

/// Lists all users, oldest first
#[instrument(skip(pool))]
pub fn list_users(pool: &DbPool) -> Result<Vec<User>> {
    let conn = &mut pool.get()?;

    let result = users::table
        .order(users::created_at.asc())
        .load::<User>(conn)?;

    debug!("Retrieved {} users", result.len());
    Ok(result)
}

#[cfg(test)]
mod tests;
