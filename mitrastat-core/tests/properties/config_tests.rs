//! Property tests for settings

use mitrastat_core::config::{
    AppSettings, ConfigManager, MAX_POLL_INTERVAL_SECS, MIN_POLL_INTERVAL_SECS, PollSettings,
};
use proptest::prelude::*;
use std::path::Path;

proptest! {
    /// Property: the effective poll interval always lies within bounds
    #[test]
    fn effective_interval_is_clamped(interval_secs in any::<u64>()) {
        let poll = PollSettings { interval_secs };
        let effective = poll.effective_interval_secs();

        prop_assert!((MIN_POLL_INTERVAL_SECS..=MAX_POLL_INTERVAL_SECS).contains(&effective));
        if (MIN_POLL_INTERVAL_SECS..=MAX_POLL_INTERVAL_SECS).contains(&interval_secs) {
            prop_assert_eq!(effective, interval_secs);
        }
        prop_assert_eq!(poll.effective_interval().as_secs(), effective);
    }

    /// Property: router host and port survive a TOML round trip
    #[test]
    fn router_section_roundtrip(
        host in "[a-z][a-z0-9-]{0,20}(\\.[a-z]{2,5})?",
        port in 1u16..=u16::MAX,
        interval_secs in 5u64..3600,
    ) {
        let content = format!(
            "[router]\nhost = \"{host}\"\nport = {port}\n\n[poll]\ninterval_secs = {interval_secs}\n"
        );
        let settings: AppSettings = ConfigManager::parse(&content, Path::new("config.toml"))
            .expect("valid settings");

        prop_assert_eq!(&settings.router.host, &host);
        prop_assert_eq!(settings.router.port, port);
        prop_assert_eq!(settings.poll.interval_secs, interval_secs);
        prop_assert!(settings.router.password.is_none());
    }
}
