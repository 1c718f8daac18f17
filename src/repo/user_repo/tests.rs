use super::*;
use crate::repo::tests::setup_test_db;

#[test]
fn test_create_and_get_user() {
    let pool = setup_test_db();

    let user = create_user(&pool, "mia@example.com".to_string(), "Mia".to_string(), UserRole::Admin).unwrap();

    let fetched = get_user(&pool, &user.get_id()).unwrap().unwrap();
    assert_eq!(fetched, user);
    assert_eq!(fetched.get_role(), UserRole::Admin);

    let by_email = get_user_by_email(&pool, "mia@example.com").unwrap().unwrap();
    assert_eq!(by_email.get_id(), user.get_id());
}

#[test]
fn test_duplicate_email_is_rejected() {
    let pool = setup_test_db();

    create_user(&pool, "dup@example.com".to_string(), "One".to_string(), UserRole::Producer).unwrap();
    let result = create_user(&pool, "dup@example.com".to_string(), "Two".to_string(), UserRole::Viewer);

    assert!(result.is_err());
    assert_eq!(list_users(&pool).unwrap().len(), 1);
}

#[test]
fn test_get_nonexistent_user() {
    let pool = setup_test_db();

    assert!(get_user(&pool, "nonexistent-id").unwrap().is_none());
    assert!(get_user_by_email(&pool, "nobody@example.com").unwrap().is_none());
}
