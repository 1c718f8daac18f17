use super::*;
use proptest::prelude::*;

/// Generates an arbitrary ConfigUpdate touching a representative subset of fields
fn arb_config_update() -> impl Strategy<Value = ConfigUpdate> {
    (
        prop::option::of("\\PC*"),
        prop::option::of(any::<u16>()),
        prop::option::of(0i64..3650),
        prop::option::of(any::<bool>()),
        prop::option::of("https://[a-z]{1,12}\\.example/[a-z]{0,8}"),
    )
        .prop_map(|(database_url, port, sync_future_days, push_on_write, webhook_url)| ConfigUpdate {
            database_url,
            port,
            sync_future_days,
            push_on_write,
            webhook_url,
            ..ConfigUpdate::default()
        })
}

proptest! {
    /// Applying an empty update leaves the config unchanged
    #[test]
    fn prop_empty_update_is_identity(update in arb_config_update()) {
        let config = base_config(None).apply_update(update);
        let again = config.clone().apply_update(ConfigUpdate::default());
        prop_assert_eq!(again, config);
    }

    /// Applying the same update twice is the same as applying it once
    #[test]
    fn prop_apply_update_is_idempotent(update in arb_config_update()) {
        let once = base_config(None).apply_update(update.clone());
        let twice = once.clone().apply_update(update);
        prop_assert_eq!(once, twice);
    }

    /// The later update wins for every field it sets
    #[test]
    fn prop_later_update_wins(first in arb_config_update(), second in arb_config_update()) {
        let config = base_config(None).apply_update(first.clone()).apply_update(second.clone());

        if let Some(port) = second.port {
            prop_assert_eq!(config.port, port);
        } else if let Some(port) = first.port {
            prop_assert_eq!(config.port, port);
        }
        if let Some(url) = second.database_url {
            prop_assert_eq!(config.database_url, url);
        }
    }

    /// Config files round-trip through TOML
    #[test]
    fn prop_update_round_trips_through_toml(update in arb_config_update()) {
        let text = toml::to_string(&update).unwrap();
        let parsed: ConfigUpdate = toml::from_str(&text).unwrap();
        prop_assert_eq!(parsed, update);
    }
}
