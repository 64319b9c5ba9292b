//! Test utilities and mock types for cyclelog development.
//!
//! Provides mock implementations of the collaborator traits
//! ([`DataReceiver`], [`ReplaySource`], [`TelemetryBus`], [`Clock`]) and
//! the loggable fixtures in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender};
use cyclelog_core::{DataReceiver, ReceiverError, ReplaySource, Table, Value};
use cyclelog_engine::{Clock, TelemetryBus, TelemetryEvent};

/// Mock [`DataReceiver`] keeping every table it is given.
///
/// Clones share the captured tables, so keep one clone and hand the
/// other to the logger.
#[derive(Clone, Default)]
pub struct MockReceiver {
    tables: Arc<Mutex<Vec<Table>>>,
    starts: Arc<AtomicUsize>,
    ends: Arc<AtomicUsize>,
    fail_puts: bool,
}

impl MockReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A receiver whose `put_table` always fails.
    pub fn failing() -> Self {
        Self {
            fail_puts: true,
            ..Self::default()
        }
    }

    /// Tables received so far.
    pub fn tables(&self) -> Vec<Table> {
        self.tables.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.tables.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn ends(&self) -> usize {
        self.ends.load(Ordering::SeqCst)
    }
}

impl DataReceiver for MockReceiver {
    fn start(&mut self) -> Result<(), ReceiverError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn put_table(&mut self, table: &Table) -> Result<(), ReceiverError> {
        if self.fail_puts {
            return Err("mock receiver failure".into());
        }
        self.tables.lock().unwrap().push(table.clone());
        Ok(())
    }

    fn end(&mut self) -> Result<(), ReceiverError> {
        self.ends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Receiver that blocks inside `put_table` until released, for holding
/// the dispatcher thread still while a test fills the queue.
pub struct GatedReceiver {
    entered: Sender<i64>,
    release: Receiver<()>,
}

/// Test-side controls for a [`GatedReceiver`].
pub struct Gate {
    /// Receives the timestamp of each table as the receiver picks it up.
    pub entered: Receiver<i64>,
    release: Option<Sender<()>>,
}

impl Gate {
    /// Let one blocked `put_table` call return.
    pub fn release_one(&self) {
        if let Some(tx) = &self.release {
            let _ = tx.send(());
        }
    }

    /// Let every current and future `put_table` call return.
    pub fn open(&mut self) {
        self.release.take();
    }
}

impl GatedReceiver {
    pub fn new() -> (Self, Gate) {
        let (entered_tx, entered_rx) = crossbeam_channel::unbounded();
        let (release_tx, release_rx) = crossbeam_channel::bounded(0);
        (
            Self {
                entered: entered_tx,
                release: release_rx,
            },
            Gate {
                entered: entered_rx,
                release: Some(release_tx),
            },
        )
    }
}

impl DataReceiver for GatedReceiver {
    fn put_table(&mut self, table: &Table) -> Result<(), ReceiverError> {
        let _ = self.entered.send(table.timestamp());
        let _ = self.release.recv();
        Ok(())
    }
}

/// Mock [`ReplaySource`] feeding a fixed list of cycles.
pub struct MockReplaySource {
    cycles: std::vec::IntoIter<Table>,
    fail_start: bool,
}

impl MockReplaySource {
    pub fn new(cycles: Vec<Table>) -> Self {
        Self {
            cycles: cycles.into_iter(),
            fail_start: false,
        }
    }

    /// A source whose `start` fails, like a foreign or corrupt log.
    pub fn invalid() -> Self {
        Self {
            cycles: Vec::new().into_iter(),
            fail_start: true,
        }
    }
}

impl ReplaySource for MockReplaySource {
    fn start(&mut self) -> Result<(), ReceiverError> {
        if self.fail_start {
            return Err("mock replay source is invalid".into());
        }
        Ok(())
    }

    fn update_table(&mut self, table: &Table) -> Result<bool, ReceiverError> {
        let Some(next) = self.cycles.next() else {
            return Ok(false);
        };
        table.set_timestamp(next.timestamp());
        for (key, value) in next.get_all(false) {
            let rel = key.strip_prefix('/').unwrap_or(&key);
            table.put_value(rel, value);
        }
        Ok(true)
    }
}

/// [`TelemetryBus`] that records every event.
#[derive(Clone, Default)]
pub struct RecordingBus {
    events: Arc<Mutex<Vec<TelemetryEvent>>>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Topics of every publish, excluding timestamps.
    pub fn published_topics(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                TelemetryEvent::Publish { topic, .. } if !topic.ends_with("/Timestamp") => {
                    Some(topic.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl TelemetryBus for RecordingBus {
    fn announce(&mut self, topic: &str, type_name: &str) {
        self.events.lock().unwrap().push(TelemetryEvent::Announce {
            topic: topic.to_owned(),
            type_name: type_name.to_owned(),
        });
    }

    fn set_property(&mut self, topic: &str, name: &str, value: &str) {
        self.events.lock().unwrap().push(TelemetryEvent::Property {
            topic: topic.to_owned(),
            name: name.to_owned(),
            value: value.to_owned(),
        });
    }

    fn publish(&mut self, topic: &str, timestamp: i64, value: &Value) {
        self.events.lock().unwrap().push(TelemetryEvent::Publish {
            topic: topic.to_owned(),
            timestamp,
            value: value.clone(),
        });
    }
}

/// [`Clock`] advanced only by the test, or by `sleep_until`.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start_us: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_us)),
        }
    }

    pub fn set(&self, now_us: i64) {
        self.now.store(now_us, Ordering::SeqCst);
    }

    pub fn advance(&self, by_us: i64) {
        self.now.fetch_add(by_us, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_us(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }

    fn sleep_until(&self, deadline_us: i64) {
        self.now.fetch_max(deadline_us, Ordering::SeqCst);
    }
}
