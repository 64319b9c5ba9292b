//! Fan-out of cycle snapshots to data receivers.
//!
//! The control loop hands each finished cycle to [`ReceiverPipeline::try_push`],
//! which never blocks: snapshots travel over a bounded crossbeam channel to
//! a single dispatcher thread that owns every receiver exclusively and
//! calls them in registration order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use cyclelog_core::{DataReceiver, Table};

use crate::config::ConfigError;

// ── Error types ──────────────────────────────────────────────────

/// Error handing a snapshot to the dispatcher thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PushError {
    /// The queue is at capacity; the snapshot was discarded.
    #[error("receiver queue full")]
    QueueFull,
    /// The dispatcher thread has shut down.
    #[error("receiver thread has shut down")]
    Disconnected,
}

// ── ShutdownReport ───────────────────────────────────────────────

/// Report from [`ReceiverPipeline::shutdown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Whether the dispatcher thread was joined successfully.
    pub joined: bool,
    /// Snapshots delivered to the receivers over the pipeline's lifetime.
    pub delivered: u64,
}

// ── Dispatcher ───────────────────────────────────────────────────

struct Slot {
    receiver: Box<dyn DataReceiver>,
    active: bool,
}

/// State owned by the dispatcher thread.
struct DispatchState {
    slots: Vec<Slot>,
    queue: Receiver<Table>,
    delivered: Arc<AtomicU64>,
}

impl DispatchState {
    /// Main loop. Runs until every sender is dropped and the queue is empty.
    fn run(mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Err(err) = slot.receiver.start() {
                tracing::error!(receiver = index, "receiver failed to start: {err}");
                slot.active = false;
            }
        }

        while let Ok(table) = self.queue.recv() {
            for (index, slot) in self.slots.iter_mut().enumerate() {
                if !slot.active {
                    continue;
                }
                if let Err(err) = slot.receiver.put_table(&table) {
                    tracing::error!(receiver = index, "receiver failed to consume cycle: {err}");
                }
            }
            self.delivered.fetch_add(1, Ordering::Relaxed);
        }

        for (index, slot) in self.slots.iter_mut().enumerate() {
            if !slot.active {
                continue;
            }
            if let Err(err) = slot.receiver.end() {
                tracing::error!(receiver = index, "receiver failed to finish: {err}");
            }
        }
    }
}

// ── ReceiverPipeline ─────────────────────────────────────────────

/// Bounded queue plus dispatcher thread feeding a fixed set of receivers.
///
/// Receivers are started once on the dispatcher thread before the first
/// snapshot and finished once after the last. A receiver whose `start`
/// fails is skipped for the rest of the run; a failing `put_table` is
/// logged and does not affect the other receivers.
pub struct ReceiverPipeline {
    tx: Option<Sender<Table>>,
    dispatcher: Option<JoinHandle<()>>,
    capacity: usize,
    delivered: Arc<AtomicU64>,
}

impl ReceiverPipeline {
    /// Spawn the dispatcher thread.
    pub fn spawn(
        receivers: Vec<Box<dyn DataReceiver>>,
        capacity: usize,
    ) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::InvalidQueueCapacity { value: capacity });
        }
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        let delivered = Arc::new(AtomicU64::new(0));
        let state = DispatchState {
            slots: receivers
                .into_iter()
                .map(|receiver| Slot {
                    receiver,
                    active: true,
                })
                .collect(),
            queue: rx,
            delivered: Arc::clone(&delivered),
        };
        let dispatcher = thread::Builder::new()
            .name("cyclelog-receiver".into())
            .spawn(move || state.run())
            .map_err(|e| ConfigError::ThreadSpawnFailed {
                reason: e.to_string(),
            })?;

        Ok(Self {
            tx: Some(tx),
            dispatcher: Some(dispatcher),
            capacity,
            delivered,
        })
    }

    /// Queue a snapshot without blocking.
    pub fn try_push(&self, table: Table) -> Result<(), PushError> {
        let tx = self.tx.as_ref().ok_or(PushError::Disconnected)?;
        tx.try_send(table).map_err(|e| match e {
            TrySendError::Full(_) => PushError::QueueFull,
            TrySendError::Disconnected(_) => PushError::Disconnected,
        })
    }

    /// Snapshots waiting for the dispatcher.
    pub fn len(&self) -> usize {
        self.tx.as_ref().map_or(0, Sender::len)
    }

    /// Whether no snapshot is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshots delivered to the receivers so far.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Whether the dispatcher thread is still accepting snapshots.
    pub fn is_running(&self) -> bool {
        self.tx.is_some()
    }

    /// Close the queue, let the dispatcher drain what is already queued,
    /// finish every receiver and join the thread. Idempotent.
    pub fn shutdown(&mut self) -> ShutdownReport {
        self.tx.take();
        let joined = match self.dispatcher.take() {
            Some(handle) => handle.join().is_ok(),
            None => true,
        };
        ShutdownReport {
            joined,
            delivered: self.delivered(),
        }
    }
}

impl Drop for ReceiverPipeline {
    fn drop(&mut self) {
        if self.dispatcher.is_some() {
            self.shutdown();
        }
    }
}

impl std::fmt::Debug for ReceiverPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiverPipeline")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("delivered", &self.delivered())
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use crossbeam_channel::{bounded, unbounded};
    use cyclelog_core::ReceiverError;

    /// Records the timestamp of every table plus lifecycle calls.
    struct Collect {
        log: Arc<Mutex<Vec<String>>>,
        fail_start: bool,
        fail_put: bool,
    }

    impl Collect {
        fn new(log: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                log: Arc::clone(log),
                fail_start: false,
                fail_put: false,
            }
        }
    }

    impl DataReceiver for Collect {
        fn start(&mut self) -> Result<(), ReceiverError> {
            self.log.lock().unwrap().push("start".into());
            if self.fail_start {
                return Err("start refused".into());
            }
            Ok(())
        }

        fn put_table(&mut self, table: &Table) -> Result<(), ReceiverError> {
            if self.fail_put {
                return Err("put refused".into());
            }
            self.log.lock().unwrap().push(format!("put {}", table.timestamp()));
            Ok(())
        }

        fn end(&mut self) -> Result<(), ReceiverError> {
            self.log.lock().unwrap().push("end".into());
            Ok(())
        }
    }

    /// Signals on entry to `put_table`, then blocks until released.
    struct Gated {
        entered: Sender<()>,
        release: Receiver<()>,
    }

    impl DataReceiver for Gated {
        fn put_table(&mut self, _table: &Table) -> Result<(), ReceiverError> {
            let _ = self.entered.send(());
            let _ = self.release.recv();
            Ok(())
        }
    }

    #[test]
    fn delivers_in_order_then_finishes() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = ReceiverPipeline::spawn(vec![Box::new(Collect::new(&log))], 8).unwrap();
        for ts in 1..=3 {
            pipeline.try_push(Table::new(ts)).unwrap();
        }
        let report = pipeline.shutdown();
        assert!(report.joined);
        assert_eq!(report.delivered, 3);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["start", "put 1", "put 2", "put 3", "end"]
        );
    }

    #[test]
    fn failing_receiver_does_not_block_others() {
        let bad_log = Arc::new(Mutex::new(Vec::new()));
        let good_log = Arc::new(Mutex::new(Vec::new()));
        let mut bad = Collect::new(&bad_log);
        bad.fail_put = true;
        let mut pipeline = ReceiverPipeline::spawn(
            vec![Box::new(bad), Box::new(Collect::new(&good_log))],
            4,
        )
        .unwrap();
        pipeline.try_push(Table::new(5)).unwrap();
        pipeline.shutdown();
        assert_eq!(*good_log.lock().unwrap(), vec!["start", "put 5", "end"]);
        assert_eq!(*bad_log.lock().unwrap(), vec!["start", "end"]);
    }

    #[test]
    fn receiver_that_fails_to_start_is_skipped() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bad = Collect::new(&log);
        bad.fail_start = true;
        let mut pipeline = ReceiverPipeline::spawn(vec![Box::new(bad)], 4).unwrap();
        pipeline.try_push(Table::new(1)).unwrap();
        pipeline.shutdown();
        assert_eq!(*log.lock().unwrap(), vec!["start"]);
    }

    #[test]
    fn full_queue_rejects_without_blocking() {
        let (entered_tx, entered_rx) = unbounded();
        let (release_tx, release_rx) = bounded(0);
        let gated = Gated {
            entered: entered_tx,
            release: release_rx,
        };
        let mut pipeline = ReceiverPipeline::spawn(vec![Box::new(gated)], 2).unwrap();

        // Park the dispatcher inside put_table so the queue stays put.
        pipeline.try_push(Table::new(0)).unwrap();
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        pipeline.try_push(Table::new(1)).unwrap();
        pipeline.try_push(Table::new(2)).unwrap();
        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.try_push(Table::new(3)), Err(PushError::QueueFull));
        assert_eq!(pipeline.len(), 2);

        drop(release_tx);
        let report = pipeline.shutdown();
        assert_eq!(report.delivered, 3);
    }

    #[test]
    fn push_after_shutdown_is_disconnected() {
        let mut pipeline = ReceiverPipeline::spawn(Vec::new(), 1).unwrap();
        pipeline.shutdown();
        assert_eq!(
            pipeline.try_push(Table::new(0)),
            Err(PushError::Disconnected)
        );
        assert!(pipeline.shutdown().joined);
    }

    #[test]
    fn zero_capacity_rejected() {
        assert!(matches!(
            ReceiverPipeline::spawn(Vec::new(), 0),
            Err(ConfigError::InvalidQueueCapacity { value: 0 })
        ));
    }
}
