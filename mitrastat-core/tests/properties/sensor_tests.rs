//! Property tests for the sensor catalog

use std::collections::HashSet;

use mitrastat_core::config::SensorSettings;
use mitrastat_core::sensors::SensorCatalog;
use proptest::prelude::*;

fn names() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("(eth[0-9]|veip0\\.[0-9]|ppp0\\.[0-9])", 0..5).prop_map(|mut v| {
        v.sort();
        v.dedup();
        v
    })
}

proptest! {
    /// Property: keys and object ids are unique and topic-safe
    #[test]
    fn catalog_keys_are_unique(
        lan in names(),
        wan in names(),
        lan_speed in names(),
        wan_speed in names(),
        optical in any::<bool>(),
    ) {
        let settings = SensorSettings {
            lan_interfaces: lan.clone(),
            wan_interfaces: wan.clone(),
            lan_speed_interfaces: lan_speed.clone(),
            wan_speed_interfaces: wan_speed.clone(),
            optical,
        };
        let catalog = SensorCatalog::new(&settings);

        let mut keys = HashSet::new();
        let mut object_ids = HashSet::new();
        for sensor in catalog.sensors() {
            prop_assert!(keys.insert(sensor.key.clone()), "duplicate key {}", sensor.key);
            let object_id = sensor.object_id();
            prop_assert!(!object_id.contains(['.', '/', '+', '#']));
            prop_assert!(object_ids.insert(object_id));
            prop_assert_eq!(sensor.unique_id(), format!("mitrastar_{}", sensor.key));
        }

        let expected = lan.len() * 18 + wan.len() * 16
            + (lan_speed.len() + wan_speed.len()) * 2
            + if optical { 5 } else { 0 };
        prop_assert_eq!(catalog.len(), expected);
    }
}
