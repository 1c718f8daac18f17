use crate::db::DbPool;
use crate::dto::UpdatePostIdeaDto;
use crate::models::PostIdea;
use crate::schema::{post_ideas, shoots};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use anyhow::Result;
use tracing::{instrument, debug, info};

use super::RepoError;

fn ensure_shoot_owned(conn: &mut SqliteConnection, user_id: &str, shoot_id: &str) -> Result<()> {
    let owned = shoots::table
        .filter(shoots::id.eq(shoot_id))
        .filter(shoots::user_id.eq(user_id))
        .count()
        .get_result::<i64>(conn)?;
    if owned == 0 {
        return Err(RepoError::NotFound.into());
    }
    Ok(())
}

/// Creates a post idea attached to one of the user's shoots
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `user_id` - The user who owns the shoot
/// * `shoot_id` - The shoot the idea belongs to
/// * `title` - Short title for the post
/// * `caption` - Optional draft caption
/// * `platform` - Optional target platform, free text
///
/// ### Returns
///
/// A Result containing the new PostIdea, in the `idea` status
#[instrument(skip(pool, caption), fields(user_id = %user_id, shoot_id = %shoot_id))]
pub fn create_post_idea(
    pool: &DbPool,
    user_id: &str,
    shoot_id: &str,
    title: String,
    caption: Option<String>,
    platform: Option<String>,
) -> Result<PostIdea> {
    if title.trim().is_empty() {
        return Err(RepoError::Invalid("Post idea title must not be empty".to_string()).into());
    }

    let conn = &mut pool.get()?;
    ensure_shoot_owned(conn, user_id, shoot_id)?;

    let idea = PostIdea::new(shoot_id.to_string(), title, caption, platform);
    diesel::insert_into(post_ideas::table)
        .values(&idea)
        .execute(conn)?;

    info!("Created post idea with id: {}", idea.get_id());
    Ok(idea)
}

/// Retrieves a post idea, provided its shoot belongs to the user
#[instrument(skip(pool), fields(user_id = %user_id, idea_id = %idea_id))]
pub fn get_post_idea(pool: &DbPool, user_id: &str, idea_id: &str) -> Result<Option<PostIdea>> {
    let conn = &mut pool.get()?;

    let result = post_ideas::table
        .inner_join(shoots::table)
        .filter(post_ideas::id.eq(idea_id))
        .filter(shoots::user_id.eq(user_id))
        .select(PostIdea::as_select())
        .first::<PostIdea>(conn)
        .optional()?;

    debug!("Post idea found: {}", result.is_some());
    Ok(result)
}

/// Lists the post ideas for one of the user's shoots, oldest first
///
/// ### Errors
///
/// Returns `RepoError::NotFound` when the shoot does not exist for this user
#[instrument(skip(pool), fields(user_id = %user_id, shoot_id = %shoot_id))]
pub fn list_post_ideas_for_shoot(pool: &DbPool, user_id: &str, shoot_id: &str) -> Result<Vec<PostIdea>> {
    let conn = &mut pool.get()?;
    ensure_shoot_owned(conn, user_id, shoot_id)?;

    let result = post_ideas::table
        .filter(post_ideas::shoot_id.eq(shoot_id))
        .order(post_ideas::created_at.asc())
        .load::<PostIdea>(conn)?;

    debug!("Retrieved {} post ideas", result.len());
    Ok(result)
}

/// Applies a partial update to a post idea
#[instrument(skip(pool, update), fields(user_id = %user_id, idea_id = %idea_id))]
pub fn update_post_idea(
    pool: &DbPool,
    user_id: &str,
    idea_id: &str,
    update: &UpdatePostIdeaDto,
) -> Result<PostIdea> {
    let mut idea = get_post_idea(pool, user_id, idea_id)?.ok_or(RepoError::NotFound)?;

    if let Some(title) = &update.title {
        if title.trim().is_empty() {
            return Err(RepoError::Invalid("Post idea title must not be empty".to_string()).into());
        }
        idea.set_title(title.clone());
    }
    if update.caption.is_some() {
        idea.set_caption(update.caption.clone());
    }
    if update.platform.is_some() {
        idea.set_platform(update.platform.clone());
    }
    if let Some(status) = update.status {
        idea.set_status(status);
    }
    idea.touch();

    let conn = &mut pool.get()?;
    diesel::update(post_ideas::table.filter(post_ideas::id.eq(idea_id)))
        .set(&idea)
        .execute(conn)?;

    info!("Updated post idea {}", idea_id);
    Ok(idea)
}

/// Deletes a post idea
#[instrument(skip(pool), fields(user_id = %user_id, idea_id = %idea_id))]
pub fn delete_post_idea(pool: &DbPool, user_id: &str, idea_id: &str) -> Result<()> {
    get_post_idea(pool, user_id, idea_id)?.ok_or(RepoError::NotFound)?;

    let conn = &mut pool.get()?;
    diesel::delete(post_ideas::table.filter(post_ideas::id.eq(idea_id))).execute(conn)?;

    info!("Deleted post idea {}", idea_id);
    Ok(())
}

#[cfg(test)]
mod tests;
