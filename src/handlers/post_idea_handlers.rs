use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{instrument, debug, info};

use crate::auth::{CurrentUser, RequireWriter};
use crate::db::DbPool;
use crate::dto::{CreatePostIdeaDto, UpdatePostIdeaDto};
use crate::errors::ApiError;
use crate::models::PostIdea;
use crate::repo;

/// Handler for adding a post idea to a shoot
///
/// This function handles POST requests to `/shoots/{id}/post_ideas`.
///
/// ### Arguments
///
/// * `pool` - The database connection pool
/// * `user` - The signed-in user, who must own the shoot
/// * `shoot_id` - The shoot the idea belongs to
/// * `payload` - The idea's title, caption and platform
///
/// ### Returns
///
/// The new post idea as JSON
#[instrument(skip(pool, user, payload), fields(user_id = %user.id(), shoot_id = %shoot_id))]
pub async fn create_post_idea_handler(
    State(pool): State<Arc<DbPool>>,
    RequireWriter(user): RequireWriter,
    Path(shoot_id): Path<String>,
    Json(payload): Json<CreatePostIdeaDto>,
) -> Result<Json<PostIdea>, ApiError> {
    info!("Creating post idea");

    let idea = repo::create_post_idea(
        &pool,
        &user.id(),
        &shoot_id,
        payload.title,
        payload.caption,
        payload.platform,
    )?;

    info!("Successfully created post idea with id: {}", idea.get_id());
    Ok(Json(idea))
}

/// Handler for listing a shoot's post ideas
///
/// This function handles GET requests to `/shoots/{id}/post_ideas`.
#[instrument(skip(pool, user), fields(user_id = %user.id(), shoot_id = %shoot_id))]
pub async fn list_post_ideas_handler(
    State(pool): State<Arc<DbPool>>,
    user: CurrentUser,
    Path(shoot_id): Path<String>,
) -> Result<Json<Vec<PostIdea>>, ApiError> {
    debug!("Listing post ideas");

    let ideas = repo::list_post_ideas_for_shoot(&pool, &user.id(), &shoot_id)?;

    info!("Retrieved {} post ideas", ideas.len());
    Ok(Json(ideas))
}

#[instrument(skip(pool, user), fields(user_id = %user.id(), idea_id = %idea_id))]
pub async fn get_post_idea_handler(
    State(pool): State<Arc<DbPool>>,
    user: CurrentUser,
    Path(idea_id): Path<String>,
) -> Result<Json<PostIdea>, ApiError> {
    let idea = repo::get_post_idea(&pool, &user.id(), &idea_id)?.ok_or(ApiError::NotFound)?;
    Ok(Json(idea))
}

/// Handler for partially updating a post idea
///
/// This function handles PATCH requests to `/post_ideas/{id}`.
#[instrument(skip(pool, user, payload), fields(user_id = %user.id(), idea_id = %idea_id))]
pub async fn update_post_idea_handler(
    State(pool): State<Arc<DbPool>>,
    RequireWriter(user): RequireWriter,
    Path(idea_id): Path<String>,
    Json(payload): Json<UpdatePostIdeaDto>,
) -> Result<Json<PostIdea>, ApiError> {
    info!("Updating post idea");

    let idea = repo::update_post_idea(&pool, &user.id(), &idea_id, &payload)?;

    Ok(Json(idea))
}

#[instrument(skip(pool, user), fields(user_id = %user.id(), idea_id = %idea_id))]
pub async fn delete_post_idea_handler(
    State(pool): State<Arc<DbPool>>,
    RequireWriter(user): RequireWriter,
    Path(idea_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    info!("Deleting post idea");

    repo::delete_post_idea(&pool, &user.id(), &idea_id)?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PostIdeaStatus;
    use crate::tests::{seed_user_and_client, setup_test_db};
    use chrono::{Duration, Utc};

    fn seed_shoot(pool: &DbPool) -> (crate::models::User, crate::models::Shoot) {
        let (user, client) = seed_user_and_client(pool);
        let start = Utc::now() + Duration::days(2);
        let shoot = repo::create_shoot(
            pool,
            &user.get_id(),
            &client.get_id(),
            "Menu shoot".to_string(),
            None,
            None,
            start,
            start + Duration::hours(3),
        )
        .unwrap();
        (user, shoot)
    }

    #[tokio::test]
    async fn test_post_idea_lifecycle() {
        let pool = setup_test_db();
        let (user, shoot) = seed_shoot(&pool);

        let idea = create_post_idea_handler(
            State(pool.clone()),
            RequireWriter(CurrentUser(user.clone())),
            Path(shoot.get_id()),
            Json(CreatePostIdeaDto {
                title: "Behind the scenes reel".to_string(),
                caption: None,
                platform: Some("instagram".to_string()),
            }),
        )
        .await
        .unwrap()
        .0;
        assert_eq!(idea.get_status(), PostIdeaStatus::Idea);

        let updated = update_post_idea_handler(
            State(pool.clone()),
            RequireWriter(CurrentUser(user.clone())),
            Path(idea.get_id()),
            Json(UpdatePostIdeaDto { status: Some(PostIdeaStatus::Planned), ..UpdatePostIdeaDto::default() }),
        )
        .await
        .unwrap()
        .0;
        assert_eq!(updated.get_status(), PostIdeaStatus::Planned);

        let listed = list_post_ideas_handler(State(pool.clone()), CurrentUser(user.clone()), Path(shoot.get_id()))
            .await
            .unwrap()
            .0;
        assert_eq!(listed.len(), 1);

        delete_post_idea_handler(State(pool.clone()), RequireWriter(CurrentUser(user.clone())), Path(idea.get_id()))
            .await
            .unwrap();
        let gone = get_post_idea_handler(State(pool.clone()), CurrentUser(user), Path(idea.get_id())).await;
        assert!(matches!(gone, Err(ApiError::NotFound)));
    }

    #[tokio::test]
    async fn test_post_idea_on_foreign_shoot_is_not_found() {
        let pool = setup_test_db();
        let (_, shoot) = seed_shoot(&pool);
        let (stranger, _) = seed_user_and_client(&pool);

        let result = create_post_idea_handler(
            State(pool.clone()),
            RequireWriter(CurrentUser(stranger)),
            Path(shoot.get_id()),
            Json(CreatePostIdeaDto { title: "Sneaky".to_string(), caption: None, platform: None }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::NotFound)));
    }
}
