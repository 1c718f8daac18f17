use crate::db::DbPool;
use crate::models::WebhookChannel;
use crate::schema::webhook_channels;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use anyhow::Result;
use tracing::{instrument, debug, info};

/// Stores a newly opened push channel
#[instrument(skip(pool, channel), fields(channel_id = %channel.get_id(), user_id = %channel.get_user_id()))]
pub fn create_webhook_channel(pool: &DbPool, channel: &WebhookChannel) -> Result<()> {
    let conn = &mut pool.get()?;

    diesel::insert_into(webhook_channels::table)
        .values(channel)
        .execute(conn)?;

    info!("Stored webhook channel expiring at {}", channel.get_expires_at());
    Ok(())
}

/// Retrieves a push channel by its channel id
#[instrument(skip(pool), fields(channel_id = %channel_id))]
pub fn get_webhook_channel(pool: &DbPool, channel_id: &str) -> Result<Option<WebhookChannel>> {
    let conn = &mut pool.get()?;

    let result = webhook_channels::table
        .filter(webhook_channels::id.eq(channel_id))
        .first::<WebhookChannel>(conn)
        .optional()?;

    debug!("Webhook channel found: {}", result.is_some());
    Ok(result)
}

/// Lists the user's push channels, newest first
#[instrument(skip(pool), fields(user_id = %user_id))]
pub fn list_channels_for_user(pool: &DbPool, user_id: &str) -> Result<Vec<WebhookChannel>> {
    let conn = &mut pool.get()?;

    let result = webhook_channels::table
        .filter(webhook_channels::user_id.eq(user_id))
        .order(webhook_channels::created_at.desc())
        .load::<WebhookChannel>(conn)?;

    Ok(result)
}

/// Lists every channel, across users, that expires before `before`
#[instrument(skip(pool))]
pub fn list_channels_expiring_before(pool: &DbPool, before: DateTime<Utc>) -> Result<Vec<WebhookChannel>> {
    let conn = &mut pool.get()?;

    let result = webhook_channels::table
        .filter(webhook_channels::expires_at.lt(before.naive_utc()))
        .order(webhook_channels::expires_at.asc())
        .load::<WebhookChannel>(conn)?;

    debug!("{} channels expire before {}", result.len(), before);
    Ok(result)
}

/// Records a delivered message number if it is newer than the last one seen
///
/// The check and the write are a single conditional UPDATE, so two
/// deliveries racing with the same number cannot both be accepted.
///
/// ### Returns
///
/// `true` when the message was new and has been recorded, `false` when it
/// was a duplicate or arrived out of order
#[instrument(skip(pool), fields(channel_id = %channel_id, message_number = message_number))]
pub fn record_channel_message(pool: &DbPool, channel_id: &str, message_number: i64) -> Result<bool> {
    let conn = &mut pool.get()?;

    let updated = diesel::update(
        webhook_channels::table
            .filter(webhook_channels::id.eq(channel_id))
            .filter(
                webhook_channels::last_message_number
                    .is_null()
                    .or(webhook_channels::last_message_number.lt(message_number)),
            ),
    )
    .set(webhook_channels::last_message_number.eq(Some(message_number)))
    .execute(conn)?;

    debug!("Message accepted: {}", updated > 0);
    Ok(updated > 0)
}

/// Deletes a push channel
#[instrument(skip(pool), fields(channel_id = %channel_id))]
pub fn delete_webhook_channel(pool: &DbPool, channel_id: &str) -> Result<()> {
    let conn = &mut pool.get()?;

    diesel::delete(webhook_channels::table.filter(webhook_channels::id.eq(channel_id)))
        .execute(conn)?;

    info!("Deleted webhook channel");
    Ok(())
}
