//! Live telemetry: publish only what changed.
//!
//! [`DiffPublisher`] is a [`DataReceiver`] that keeps the previous cycle's
//! fields and forwards new or changed ones to a [`TelemetryBus`]. Topics
//! are created lazily on first publish, carrying the field's unit as a
//! `"unit"` property when it has one.

use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender};
use cyclelog_core::{DataReceiver, LoggableType, ReceiverError, Table, Value};
use indexmap::IndexMap;

/// Topic property carrying a field's unit.
pub const UNIT_PROPERTY: &str = "unit";

/// A publish/subscribe transport for live telemetry.
pub trait TelemetryBus: Send {
    /// Create `topic` with the given telemetry type name.
    fn announce(&mut self, topic: &str, type_name: &str);

    /// Attach a property to an announced topic.
    fn set_property(&mut self, topic: &str, name: &str, value: &str);

    /// Publish `value` on an announced topic at `timestamp` (µs).
    fn publish(&mut self, topic: &str, timestamp: i64, value: &Value);
}

/// One message on a [`ChannelBus`].
#[derive(Clone, Debug, PartialEq)]
pub enum TelemetryEvent {
    /// A topic was created.
    Announce {
        /// Full topic name.
        topic: String,
        /// Telemetry type name, or the custom type.
        type_name: String,
    },
    /// A topic property was set.
    Property {
        /// Full topic name.
        topic: String,
        /// Property name.
        name: String,
        /// Property value.
        value: String,
    },
    /// A value was published.
    Publish {
        /// Full topic name.
        topic: String,
        /// Cycle timestamp in microseconds.
        timestamp: i64,
        /// The published value.
        value: Value,
    },
}

/// In-process [`TelemetryBus`] fanning events out to crossbeam channels.
///
/// Clones share the subscriber list, so a clone kept outside the
/// pipeline can add subscribers after the publisher has moved onto the
/// dispatcher thread. Subscribers that hang up are dropped.
#[derive(Clone, Debug, Default)]
pub struct ChannelBus {
    subscribers: Arc<Mutex<Vec<Sender<TelemetryEvent>>>>,
}

impl ChannelBus {
    /// A bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every event sent from now on.
    pub fn subscribe(&self) -> Receiver<TelemetryEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn send(&self, event: TelemetryEvent) {
        let mut subs = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subs.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl TelemetryBus for ChannelBus {
    fn announce(&mut self, topic: &str, type_name: &str) {
        self.send(TelemetryEvent::Announce {
            topic: topic.to_owned(),
            type_name: type_name.to_owned(),
        });
    }

    fn set_property(&mut self, topic: &str, name: &str, value: &str) {
        self.send(TelemetryEvent::Property {
            topic: topic.to_owned(),
            name: name.to_owned(),
            value: value.to_owned(),
        });
    }

    fn publish(&mut self, topic: &str, timestamp: i64, value: &Value) {
        self.send(TelemetryEvent::Publish {
            topic: topic.to_owned(),
            timestamp,
            value: value.clone(),
        });
    }
}

/// Forwards changed fields of each snapshot to a [`TelemetryBus`].
///
/// Every cycle publishes `<root>/Timestamp`; each field is published at
/// `<root>/<relative path>` only when it is new or its value differs from
/// the previous cycle.
pub struct DiffPublisher<B> {
    root: String,
    bus: B,
    previous: IndexMap<String, Value>,
    topics: IndexMap<String, TopicState>,
    published: u64,
}

/// Announced type and last unit property of one topic.
struct TopicState {
    type_name: String,
    unit: Option<String>,
}

impl<B: TelemetryBus> DiffPublisher<B> {
    /// A publisher under `root` (e.g. `"/CycleLog"`).
    pub fn new(root: &str, bus: B) -> Self {
        Self {
            root: format!("/{}", root.trim_matches('/')),
            bus,
            previous: IndexMap::new(),
            topics: IndexMap::new(),
            published: 0,
        }
    }

    /// Root topic prefix.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Field values published so far, not counting timestamps.
    pub fn published(&self) -> u64 {
        self.published
    }

    /// The transport.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Announce `topic` when new or retyped, and re-send its unit
    /// property whenever a non-empty unit changes.
    fn ensure_topic(&mut self, topic: &str, value: &Value) {
        let type_name = value.telemetry_type();
        let unit = value.unit();
        match self.topics.get_mut(topic) {
            Some(known) if known.type_name == type_name => {
                if let Some(unit) = unit.filter(|u| known.unit.as_deref() != Some(*u)) {
                    self.bus.set_property(topic, UNIT_PROPERTY, unit);
                    known.unit = Some(unit.to_owned());
                }
            }
            _ => {
                self.bus.announce(topic, type_name);
                if let Some(unit) = unit {
                    self.bus.set_property(topic, UNIT_PROPERTY, unit);
                }
                self.topics.insert(
                    topic.to_owned(),
                    TopicState {
                        type_name: type_name.to_owned(),
                        unit: unit.map(str::to_owned),
                    },
                );
            }
        }
    }

    /// Publish one snapshot's changes.
    pub fn publish_table(&mut self, table: &Table) {
        let timestamp = table.timestamp();
        let ts_topic = format!("{}/Timestamp", self.root);
        let ts_value = Value::integer(timestamp);
        if !self.topics.contains_key(&ts_topic) {
            let type_name = LoggableType::Integer.telemetry_type();
            self.bus.announce(&ts_topic, type_name);
            self.topics.insert(
                ts_topic.clone(),
                TopicState {
                    type_name: type_name.to_owned(),
                    unit: None,
                },
            );
        }
        self.bus.publish(&ts_topic, timestamp, &ts_value);

        for (key, value) in table.get_all(true) {
            if self.previous.get(&key).is_some_and(|prev| *prev == value) {
                continue;
            }
            let topic = format!("{}/{}", self.root, key);
            self.ensure_topic(&topic, &value);
            self.bus.publish(&topic, timestamp, &value);
            self.published += 1;
            self.previous.insert(key, value);
        }
    }
}

impl<B: TelemetryBus> DataReceiver for DiffPublisher<B> {
    fn put_table(&mut self, table: &Table) -> Result<(), ReceiverError> {
        self.publish_table(table);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &Receiver<TelemetryEvent>) -> Vec<TelemetryEvent> {
        rx.try_iter().collect()
    }

    fn publishes(events: &[TelemetryEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|e| match e {
                TelemetryEvent::Publish { topic, .. } if !topic.ends_with("/Timestamp") => {
                    Some(topic.as_str())
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn one_changed_field_publishes_once() {
        let bus = ChannelBus::new();
        let rx = bus.subscribe();
        let mut publisher = DiffPublisher::new("/CycleLog", bus);

        let table = Table::new(0);
        table.put("RealOutputs/A", 1.0);
        table.put("RealOutputs/B", true);
        table.put("Drive/Speed", 2i64);
        publisher.publish_table(&table);
        assert_eq!(publishes(&drain(&rx)).len(), 3);

        table.set_timestamp(20_000);
        table.put("RealOutputs/A", 1.5);
        publisher.publish_table(&table);
        let events = drain(&rx);
        assert_eq!(publishes(&events), vec!["/CycleLog/RealOutputs/A"]);
        assert!(events.iter().any(|e| matches!(
            e,
            TelemetryEvent::Publish { topic, timestamp: 20_000, .. } if topic == "/CycleLog/Timestamp"
        )));
    }

    #[test]
    fn topic_announced_once_with_unit() {
        let bus = ChannelBus::new();
        let rx = bus.subscribe();
        let mut publisher = DiffPublisher::new("CycleLog/", bus);

        let table = Table::new(0);
        table.put_value("Battery", Value::double(12.3).with_unit("V"));
        publisher.publish_table(&table);
        table.put_value("Battery", Value::double(12.1).with_unit("V"));
        publisher.publish_table(&table);

        let events = drain(&rx);
        let announces: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, TelemetryEvent::Announce { topic, .. } if topic == "/CycleLog/Battery"))
            .collect();
        assert_eq!(announces.len(), 1);
        assert!(events.contains(&TelemetryEvent::Property {
            topic: "/CycleLog/Battery".into(),
            name: "unit".into(),
            value: "V".into(),
        }));
        assert_eq!(publisher.published(), 2);
    }

    #[test]
    fn unit_change_resends_property() {
        let bus = ChannelBus::new();
        let rx = bus.subscribe();
        let mut publisher = DiffPublisher::new("/CycleLog", bus);

        let table = Table::new(0);
        table.put_value("X", Value::double(1.0).with_unit("V"));
        publisher.publish_table(&table);
        table.put_value("X", Value::double(2.0).with_unit("A"));
        publisher.publish_table(&table);
        table.put_value("X", Value::double(3.0).with_unit("A"));
        publisher.publish_table(&table);

        let events = drain(&rx);
        let units: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                TelemetryEvent::Property { topic, name, value }
                    if topic == "/CycleLog/X" && name == UNIT_PROPERTY =>
                {
                    Some(value.as_str())
                }
                _ => None,
            })
            .collect();
        assert_eq!(units, vec!["V", "A"]);
        let announces = events
            .iter()
            .filter(|e| matches!(e, TelemetryEvent::Announce { topic, .. } if topic == "/CycleLog/X"))
            .count();
        assert_eq!(announces, 1);
    }

    #[test]
    fn dropped_subscriber_is_pruned() {
        let mut bus = ChannelBus::new();
        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(rx);
        bus.publish("/x", 0, &Value::boolean(true));
        assert_eq!(bus.subscriber_count(), 0);
    }
}
