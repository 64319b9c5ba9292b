//! Receiver queue overflow: the producer never blocks, drops the cycle
//! and raises a sticky fault.

use std::sync::Arc;
use std::time::Duration;

use cyclelog_engine::{Logger, LoggerConfig};
use cyclelog_test_utils::{GatedReceiver, ManualClock, MockReceiver};

const CAPACITY: usize = 3;

fn config() -> LoggerConfig {
    LoggerConfig {
        receiver_queue_capacity: CAPACITY,
        record_timing: false,
        ..LoggerConfig::default()
    }
}

fn cycle(logger: &mut Logger, clock: &ManualClock) {
    clock.advance(20_000);
    logger.periodic_before_user();
    logger.periodic_after_user(Duration::ZERO, Duration::ZERO);
}

#[test]
fn full_queue_sets_fault_and_keeps_size() {
    let clock = ManualClock::new(0);
    let (gated, mut gate) = GatedReceiver::new();
    let mock = MockReceiver::new();
    let mut logger = Logger::with_clock(config(), Arc::new(clock.clone()));
    logger.add_receiver(gated);
    logger.add_receiver(mock.clone());
    logger.start().unwrap();

    // First cycle: the dispatcher takes it and blocks in the gate.
    logger.periodic_after_user(Duration::ZERO, Duration::ZERO);
    gate.entered.recv_timeout(Duration::from_secs(5)).unwrap();

    for _ in 0..CAPACITY {
        cycle(&mut logger, &clock);
    }
    assert_eq!(logger.queued_cycles(), CAPACITY);
    assert!(!logger.receiver_queue_fault());

    cycle(&mut logger, &clock);
    assert!(logger.receiver_queue_fault());
    assert_eq!(logger.dropped_cycles(), 1);
    assert_eq!(logger.queued_cycles(), CAPACITY);

    gate.open();
    logger.end();

    // Everything that made it into the queue was delivered, in order.
    let stamps: Vec<i64> = mock.tables().iter().map(|t| t.timestamp()).collect();
    assert_eq!(stamps, vec![0, 20_000, 40_000, 60_000]);
    assert_eq!(mock.ends(), 1);
}

#[test]
fn fault_is_sticky_after_queue_drains() {
    let clock = ManualClock::new(0);
    let (gated, mut gate) = GatedReceiver::new();
    let mut logger = Logger::with_clock(config(), Arc::new(clock.clone()));
    logger.add_receiver(gated);
    logger.start().unwrap();

    logger.periodic_after_user(Duration::ZERO, Duration::ZERO);
    gate.entered.recv_timeout(Duration::from_secs(5)).unwrap();
    for _ in 0..=CAPACITY {
        cycle(&mut logger, &clock);
    }
    assert!(logger.receiver_queue_fault());

    // Drain: release the blocked cycle and the three queued ones.
    for _ in 0..=CAPACITY {
        gate.release_one();
    }
    for _ in 0..CAPACITY {
        gate.entered.recv_timeout(Duration::from_secs(5)).unwrap();
    }
    gate.open();

    cycle(&mut logger, &clock);
    assert!(logger.receiver_queue_fault());
    assert_eq!(logger.dropped_cycles(), 1);
    logger.end();
}
