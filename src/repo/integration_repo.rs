use crate::db::DbPool;
use crate::models::{Integration, IntegrationProvider};
use crate::schema::integrations;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use anyhow::Result;
use tracing::{instrument, debug, info};

use super::RepoError;

/// Stores a freshly granted integration, replacing the user's existing one
/// for the same provider
///
/// On reconnect the row keeps its id and creation time. A grant without a
/// refresh token keeps the previously stored one, since Google only sends
/// it on first consent.
///
/// ### Returns
///
/// The integration as stored
#[instrument(skip(pool, integration), fields(user_id = %integration.get_user_id(), provider = %integration.get_provider()))]
pub fn upsert_integration(pool: &DbPool, integration: Integration) -> Result<Integration> {
    let conn = &mut pool.get()?;

    let stored = conn.transaction::<_, anyhow::Error, _>(|conn| {
        let existing = integrations::table
            .filter(integrations::user_id.eq(integration.get_user_id()))
            .filter(integrations::provider.eq(integration.get_provider()))
            .first::<Integration>(conn)
            .optional()?;

        match existing {
            Some(mut current) => {
                current.set_tokens(
                    integration.get_access_token(),
                    integration.get_refresh_token(),
                    integration.get_token_expires_at(),
                );
                current.set_scope(integration.get_scope());
                current.set_calendar_id(integration.get_calendar_id());
                diesel::update(integrations::table.filter(integrations::id.eq(current.get_id())))
                    .set(&current)
                    .execute(conn)?;
                Ok(current)
            }
            None => {
                diesel::insert_into(integrations::table)
                    .values(&integration)
                    .execute(conn)?;
                Ok(integration)
            }
        }
    })?;

    info!("Stored integration {}", stored.get_id());
    Ok(stored)
}

/// Retrieves the user's integration for a provider
#[instrument(skip(pool), fields(user_id = %user_id, provider = %provider))]
pub fn get_integration(pool: &DbPool, user_id: &str, provider: IntegrationProvider) -> Result<Option<Integration>> {
    let conn = &mut pool.get()?;

    let result = integrations::table
        .filter(integrations::user_id.eq(user_id))
        .filter(integrations::provider.eq(provider.as_str()))
        .first::<Integration>(conn)
        .optional()?;

    debug!("Integration found: {}", result.is_some());
    Ok(result)
}

/// Lists every integration the user has connected
#[instrument(skip(pool), fields(user_id = %user_id))]
pub fn list_integrations_for_user(pool: &DbPool, user_id: &str) -> Result<Vec<Integration>> {
    let conn = &mut pool.get()?;

    let result = integrations::table
        .filter(integrations::user_id.eq(user_id))
        .order(integrations::provider.asc())
        .load::<Integration>(conn)?;

    Ok(result)
}

/// Persists refreshed OAuth tokens
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `integration_id` - The integration to update
/// * `access_token` - The new access token
/// * `refresh_token` - A rotated refresh token, or `None` to keep the current one
/// * `expires_at` - When the new access token expires
///
/// ### Returns
///
/// The updated integration
#[instrument(skip(pool, access_token, refresh_token), fields(integration_id = %integration_id))]
pub fn update_integration_tokens(
    pool: &DbPool,
    integration_id: &str,
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<Integration> {
    let conn = &mut pool.get()?;

    let mut integration = integrations::table
        .filter(integrations::id.eq(integration_id))
        .first::<Integration>(conn)
        .optional()?
        .ok_or(RepoError::NotFound)?;

    integration.set_tokens(access_token, refresh_token, expires_at);
    diesel::update(integrations::table.filter(integrations::id.eq(integration_id)))
        .set(&integration)
        .execute(conn)?;

    info!("Refreshed integration tokens");
    Ok(integration)
}

/// Removes the user's integration for a provider
///
/// ### Returns
///
/// Whether an integration was removed
#[instrument(skip(pool), fields(user_id = %user_id, provider = %provider))]
pub fn delete_integration(pool: &DbPool, user_id: &str, provider: IntegrationProvider) -> Result<bool> {
    let conn = &mut pool.get()?;

    let deleted = diesel::delete(
        integrations::table
            .filter(integrations::user_id.eq(user_id))
            .filter(integrations::provider.eq(provider.as_str())),
    )
    .execute(conn)?;

    info!("Deleted {} integration(s)", deleted);
    Ok(deleted > 0)
}
