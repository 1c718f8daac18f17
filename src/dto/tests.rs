use super::*;
use chrono::TimeZone;

#[test]
fn test_shoot_query_parses_repeated_statuses() {
    let query: ShootQuery =
        serde_html_form::from_str("statuses=scheduled&statuses=completed&client_id=c1").unwrap();

    assert_eq!(query.statuses, vec![ShootStatus::Scheduled, ShootStatus::Completed]);
    assert_eq!(query.client_id.as_deref(), Some("c1"));
    assert!(query.starts_after.is_none());
}

#[test]
fn test_shoot_query_defaults_when_empty() {
    let query: ShootQuery = serde_html_form::from_str("").unwrap();

    assert!(query.statuses.is_empty());
    assert!(query.client_id.is_none());
}

#[test]
fn test_shoot_query_parses_rfc3339_bounds() {
    let query: ShootQuery =
        serde_html_form::from_str("starts_after=2025-06-01T00%3A00%3A00Z").unwrap();

    assert_eq!(query.starts_after, Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()));
}

#[test]
fn test_shoot_query_rejects_unknown_status() {
    let result = serde_html_form::from_str::<ShootQuery>("statuses=postponed");
    assert!(result.is_err());
}

#[test]
fn test_update_shoot_touches_calendar() {
    assert!(!UpdateShootDto::default().touches_calendar());

    let only_client = UpdateShootDto { client_id: Some("c2".to_string()), ..Default::default() };
    assert!(!only_client.touches_calendar());

    let moved = UpdateShootDto {
        starts_at: Some(Utc::now()),
        ..Default::default()
    };
    assert!(moved.touches_calendar());
}

#[test]
fn test_sync_request_defaults_to_incremental() {
    let dto: SyncRequestDto = serde_json::from_str("{}").unwrap();
    assert!(!dto.full);
}

#[test]
fn test_create_shoot_optional_fields() {
    let dto: CreateShootDto = serde_json::from_value(serde_json::json!({
        "client_id": "c1",
        "title": "Lookbook",
        "starts_at": "2025-06-01T09:00:00Z",
        "ends_at": "2025-06-01T12:00:00Z",
    }))
    .unwrap();

    assert!(dto.location.is_none());
    assert!(dto.ends_at > dto.starts_at);
}
