use super::*;
use crate::repo::tests::{base_time, seed_user_and_client, setup_test_db};

#[test]
fn test_first_success_creates_state() {
    let pool = setup_test_db();
    let (user, _) = seed_user_and_client(&pool);

    assert!(get_sync_state(&pool, &user.get_id()).unwrap().is_none());

    let state = record_sync_success(&pool, &user.get_id(), "primary", Some("sync-1".to_string()), base_time(), true)
        .unwrap();

    assert_eq!(state.get_sync_token().as_deref(), Some("sync-1"));
    assert_eq!(state.get_last_full_sync_at(), Some(base_time()));

    let fetched = get_sync_state(&pool, &user.get_id()).unwrap().unwrap();
    assert_eq!(fetched, state);
}

#[test]
fn test_incremental_success_keeps_last_full_sync() {
    let pool = setup_test_db();
    let (user, _) = seed_user_and_client(&pool);
    let later = base_time() + chrono::Duration::minutes(5);

    record_sync_success(&pool, &user.get_id(), "primary", Some("sync-1".to_string()), base_time(), true).unwrap();
    let state = record_sync_success(&pool, &user.get_id(), "primary", Some("sync-2".to_string()), later, false)
        .unwrap();

    assert_eq!(state.get_sync_token().as_deref(), Some("sync-2"));
    assert_eq!(state.get_last_sync_at(), Some(later));
    assert_eq!(state.get_last_full_sync_at(), Some(base_time()));
}

#[test]
fn test_failure_keeps_token_and_success_clears_error() {
    let pool = setup_test_db();
    let (user, _) = seed_user_and_client(&pool);

    record_sync_success(&pool, &user.get_id(), "primary", Some("sync-1".to_string()), base_time(), true).unwrap();
    record_sync_failure(&pool, &user.get_id(), "primary", "rate limited").unwrap();

    let failed = get_sync_state(&pool, &user.get_id()).unwrap().unwrap();
    assert_eq!(failed.get_last_error().as_deref(), Some("rate limited"));
    assert_eq!(failed.get_sync_token().as_deref(), Some("sync-1"));

    record_sync_success(&pool, &user.get_id(), "primary", Some("sync-2".to_string()), base_time(), false).unwrap();
    let recovered = get_sync_state(&pool, &user.get_id()).unwrap().unwrap();
    assert!(recovered.get_last_error().is_none());
}

#[test]
fn test_clear_and_delete_sync_state() {
    let pool = setup_test_db();
    let (user, _) = seed_user_and_client(&pool);
    record_sync_success(&pool, &user.get_id(), "primary", Some("sync-1".to_string()), base_time(), true).unwrap();

    clear_sync_token(&pool, &user.get_id()).unwrap();
    let cleared = get_sync_state(&pool, &user.get_id()).unwrap().unwrap();
    assert!(!cleared.has_sync_token());
    assert_eq!(cleared.get_last_full_sync_at(), Some(base_time()));

    delete_sync_state(&pool, &user.get_id()).unwrap();
    assert!(get_sync_state(&pool, &user.get_id()).unwrap().is_none());
}
