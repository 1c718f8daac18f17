use super::*;
use crate::models::{PostIdeaStatus, UserRole};
use crate::repo::tests::{seed_user_and_client, setup_test_db, slot};
use crate::repo::{create_shoot, create_user};

fn seed_shoot(pool: &DbPool) -> (String, String) {
    let (user, client) = seed_user_and_client(pool);
    let (start, end) = slot(0, 2);
    let shoot = create_shoot(pool, &user.get_id(), &client.get_id(), "Shoot".to_string(), None, None, start, end)
        .unwrap();
    (user.get_id(), shoot.get_id())
}

#[test]
fn test_create_and_list_post_ideas() {
    let pool = setup_test_db();
    let (user_id, shoot_id) = seed_shoot(&pool);

    let reel = create_post_idea(&pool, &user_id, &shoot_id, "Behind the scenes reel".to_string(), None, Some("instagram".to_string()))
        .unwrap();
    let carousel = create_post_idea(&pool, &user_id, &shoot_id, "Carousel".to_string(), Some("Swipe".to_string()), None)
        .unwrap();

    assert_eq!(reel.get_status(), PostIdeaStatus::Idea);

    let ideas = list_post_ideas_for_shoot(&pool, &user_id, &shoot_id).unwrap();
    let ids: Vec<String> = ideas.iter().map(|i| i.get_id()).collect();
    assert!(ids.contains(&reel.get_id()));
    assert!(ids.contains(&carousel.get_id()));
    assert_eq!(ids.len(), 2);
}

#[test]
fn test_post_ideas_are_scoped_through_their_shoot() {
    let pool = setup_test_db();
    let (user_id, shoot_id) = seed_shoot(&pool);
    let idea = create_post_idea(&pool, &user_id, &shoot_id, "Reel".to_string(), None, None).unwrap();
    let other = create_user(&pool, "other@example.com".to_string(), "Other".to_string(), UserRole::Producer).unwrap();

    assert!(get_post_idea(&pool, &other.get_id(), &idea.get_id()).unwrap().is_none());

    let err = create_post_idea(&pool, &other.get_id(), &shoot_id, "Sneaky".to_string(), None, None).unwrap_err();
    assert!(matches!(err.downcast_ref::<RepoError>(), Some(RepoError::NotFound)));
}

#[test]
fn test_update_post_idea_status() {
    let pool = setup_test_db();
    let (user_id, shoot_id) = seed_shoot(&pool);
    let idea = create_post_idea(&pool, &user_id, &shoot_id, "Reel".to_string(), None, None).unwrap();

    let updated = update_post_idea(&pool, &user_id, &idea.get_id(), &UpdatePostIdeaDto {
        status: Some(PostIdeaStatus::Posted),
        caption: Some("Out now".to_string()),
        ..UpdatePostIdeaDto::default()
    })
    .unwrap();

    assert_eq!(updated.get_status(), PostIdeaStatus::Posted);
    assert_eq!(updated.get_title(), "Reel");

    let fetched = get_post_idea(&pool, &user_id, &idea.get_id()).unwrap().unwrap();
    assert_eq!(fetched.get_caption().as_deref(), Some("Out now"));
}

#[test]
fn test_delete_post_idea() {
    let pool = setup_test_db();
    let (user_id, shoot_id) = seed_shoot(&pool);
    let idea = create_post_idea(&pool, &user_id, &shoot_id, "Reel".to_string(), None, None).unwrap();

    delete_post_idea(&pool, &user_id, &idea.get_id()).unwrap();

    assert!(get_post_idea(&pool, &user_id, &idea.get_id()).unwrap().is_none());
    assert!(delete_post_idea(&pool, &user_id, &idea.get_id()).is_err());
}
