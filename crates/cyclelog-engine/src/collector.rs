//! Hardware and system telemetry collectors.
//!
//! A [`HardwareCollector`] owns one subtable of the entry table. In
//! record mode the logger asks it to capture fresh readings after user
//! code; in replay mode it restores its state from the recorded cycle
//! before user code runs.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use cyclelog_core::Table;

/// Captures a device's state into the log and restores it on replay.
pub trait HardwareCollector: Send {
    /// Name of the subtable this collector owns, e.g. `"DriverStation"`.
    fn name(&self) -> &str;

    /// Record mode: write the current readings into `table`.
    fn save_to_log(&mut self, table: &Table);

    /// Replay mode: restore state from `table`.
    fn replay_from_log(&mut self, _table: &Table) {}
}

/// Wall-clock seconds since the epoch before which the system clock is
/// considered unsynchronised (2024-01-01T00:00:00Z).
const TIME_VALID_AFTER_S: u64 = 1_704_067_200;

/// Records process-level statistics under `SystemStats`.
///
/// Fields: `SystemTimeValid` (wall clock is plausibly synchronised),
/// `EpochTimeMicros` (wall clock), `UptimeSeconds` (since construction).
#[derive(Debug)]
pub struct SystemStatsCollector {
    started: Instant,
}

impl SystemStatsCollector {
    /// A collector whose uptime counts from now.
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemStatsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareCollector for SystemStatsCollector {
    fn name(&self) -> &str {
        "SystemStats"
    }

    fn save_to_log(&mut self, table: &Table) {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        table.put("SystemTimeValid", since_epoch.as_secs() > TIME_VALID_AFTER_S);
        table.put(
            "EpochTimeMicros",
            i64::try_from(since_epoch.as_micros()).unwrap_or(i64::MAX),
        );
        table.put("UptimeSeconds", self.started.elapsed().as_secs_f64());
    }
}
