use super::*;
use crate::repo::tests::{seed_user_and_client, setup_test_db, slot};

fn cached(user_id: &str, google_event_id: &str, start_h: i64, end_h: i64) -> CalendarEvent {
    let (start, end) = slot(start_h, end_h);
    CalendarEvent::new(
        user_id.to_string(),
        google_event_id.to_string(),
        format!("Event {}", google_event_id),
        start,
        end,
        false,
        "confirmed".to_string(),
        Some(format!("\"etag-{}\"", google_event_id)),
        start,
        None,
    )
}

#[test]
fn test_upsert_inserts_then_updates_in_place() {
    let pool = setup_test_db();
    let (user, _) = seed_user_and_client(&pool);

    let (first, created) = upsert_calendar_event(&pool, cached(&user.get_id(), "evt1", 0, 1)).unwrap();
    assert!(created);

    let (second, created) = upsert_calendar_event(&pool, cached(&user.get_id(), "evt1", 2, 3)).unwrap();
    assert!(!created);
    assert_eq!(second.get_id(), first.get_id());

    let fetched = get_calendar_event(&pool, &user.get_id(), "evt1").unwrap().unwrap();
    assert_eq!(fetched.get_starts_at(), slot(2, 3).0);
}

#[test]
fn test_delete_calendar_event() {
    let pool = setup_test_db();
    let (user, _) = seed_user_and_client(&pool);
    upsert_calendar_event(&pool, cached(&user.get_id(), "evt1", 0, 1)).unwrap();

    let removed = delete_calendar_event(&pool, &user.get_id(), "evt1").unwrap();
    assert_eq!(removed.unwrap().get_google_event_id(), "evt1");
    assert!(delete_calendar_event(&pool, &user.get_id(), "evt1").unwrap().is_none());
}

#[test]
fn test_delete_not_in_only_touches_the_window() {
    let pool = setup_test_db();
    let (user, _) = seed_user_and_client(&pool);
    upsert_calendar_event(&pool, cached(&user.get_id(), "kept", 1, 2)).unwrap();
    upsert_calendar_event(&pool, cached(&user.get_id(), "gone", 3, 4)).unwrap();
    upsert_calendar_event(&pool, cached(&user.get_id(), "outside", 100, 101)).unwrap();

    let (start, end) = slot(0, 48);
    let removed = delete_calendar_events_not_in(&pool, &user.get_id(), start, end, &["kept".to_string()]).unwrap();

    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].get_google_event_id(), "gone");
    assert!(get_calendar_event(&pool, &user.get_id(), "kept").unwrap().is_some());
    assert!(get_calendar_event(&pool, &user.get_id(), "outside").unwrap().is_some());
}

#[test]
fn test_list_in_window_and_delete_for_user() {
    let pool = setup_test_db();
    let (user, _) = seed_user_and_client(&pool);
    upsert_calendar_event(&pool, cached(&user.get_id(), "b", 5, 6)).unwrap();
    upsert_calendar_event(&pool, cached(&user.get_id(), "a", 1, 2)).unwrap();

    let (start, end) = slot(0, 24);
    let listed = list_calendar_events_in_window(&pool, &user.get_id(), start, end).unwrap();
    let ids: Vec<String> = listed.iter().map(|e| e.get_google_event_id()).collect();
    assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);

    assert_eq!(delete_calendar_events_for_user(&pool, &user.get_id()).unwrap(), 2);
    assert!(list_calendar_events_in_window(&pool, &user.get_id(), start, end).unwrap().is_empty());
}
