//! Property: the diff publisher publishes exactly the fields whose value
//! changed since the previous cycle.

use cyclelog_core::Table;
use cyclelog_engine::DiffPublisher;
use cyclelog_test_utils::RecordingBus;
use proptest::prelude::*;

const KEYS: [&str; 4] = ["A", "B", "C", "D"];

proptest! {
    #[test]
    fn publishes_only_changes(cycles in prop::collection::vec(prop::collection::vec(0i64..3, KEYS.len()), 1..10)) {
        let bus = RecordingBus::new();
        let mut publisher = DiffPublisher::new("/CycleLog", bus.clone());
        let table = Table::new(0);
        let mut previous: Option<Vec<i64>> = None;

        for (i, values) in cycles.iter().enumerate() {
            table.set_timestamp(i as i64);
            for (key, v) in KEYS.iter().zip(values) {
                table.put(key, *v);
            }
            bus.clear();
            publisher.publish_table(&table);

            let expected: Vec<String> = KEYS
                .iter()
                .enumerate()
                .filter(|(k, _)| previous.as_ref().is_none_or(|p| p[*k] != values[*k]))
                .map(|(_, key)| format!("/CycleLog/{key}"))
                .collect();
            prop_assert_eq!(bus.published_topics(), expected);
            previous = Some(values.clone());
        }
    }
}
