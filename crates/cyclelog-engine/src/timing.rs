//! Per-cycle timing diagnostics for the logger itself.
//!
//! [`CycleTiming`] captures how long each logger phase took in the most
//! recent cycle. When enabled, the logger records it under the output
//! scope so slow cycles show up in the log next to the data they
//! produced.

use std::time::Duration;

use cyclelog_core::Table;

/// Output key: time spent stamping or replaying the entry table.
pub const ENTRY_UPDATE_KEY: &str = "Logger/EntryUpdateMS";
/// Output key: time spent updating dashboard inputs.
pub const DASHBOARD_INPUTS_KEY: &str = "Logger/DashboardInputsMS";
/// Output key: time spent in hardware collectors.
pub const COLLECTORS_KEY: &str = "Logger/CollectorsMS";
/// Output key: time spent capturing console text.
pub const CONSOLE_KEY: &str = "Logger/ConsoleMS";
/// Output key: snapshots waiting for the dispatcher when this cycle was pushed.
pub const QUEUED_CYCLES_KEY: &str = "Logger/QueuedCycles";
/// Output key: total logger overhead for the cycle.
pub const LOG_PERIODIC_KEY: &str = "LoggedRobot/LogPeriodicMS";
/// Output key: time spent in user code.
pub const USER_CODE_KEY: &str = "LoggedRobot/UserCodeMS";
/// Output key: the whole cycle, logger plus user code.
pub const FULL_CYCLE_KEY: &str = "LoggedRobot/FullCycleMS";

/// Timing collected during a single cycle.
///
/// `before_user` and `user_code` are measured by the caller of
/// [`Logger::periodic_after_user`](crate::Logger::periodic_after_user);
/// the remaining phases are measured by the logger.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CycleTiming {
    /// Stamping the table (record) or pulling the next cycle (replay).
    pub entry_update: Duration,
    /// Updating registered dashboard inputs.
    pub dashboard_inputs: Duration,
    /// Hardware collectors, both the replay and the capture side.
    pub collectors: Duration,
    /// Console capture.
    pub console: Duration,
    /// The whole `periodic_before_user` call.
    pub before_user: Duration,
    /// User code between the two logger calls.
    pub user_code: Duration,
    /// The `periodic_after_user` call up to the push.
    pub after_user: Duration,
    /// Snapshots waiting in the receiver queue before this cycle's push.
    pub queued_cycles: usize,
}

fn millis(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

impl CycleTiming {
    /// Logger overhead: both logger calls.
    pub fn log_periodic(&self) -> Duration {
        self.before_user + self.after_user
    }

    /// Logger overhead plus user code.
    pub fn full_cycle(&self) -> Duration {
        self.log_periodic() + self.user_code
    }

    /// Write every timing output into `outputs`.
    pub fn record(&self, outputs: &Table) {
        outputs.put(ENTRY_UPDATE_KEY, millis(self.entry_update));
        outputs.put(DASHBOARD_INPUTS_KEY, millis(self.dashboard_inputs));
        outputs.put(COLLECTORS_KEY, millis(self.collectors));
        outputs.put(CONSOLE_KEY, millis(self.console));
        outputs.put(
            QUEUED_CYCLES_KEY,
            i64::try_from(self.queued_cycles).unwrap_or(i64::MAX),
        );
        outputs.put(LOG_PERIODIC_KEY, millis(self.log_periodic()));
        outputs.put(USER_CODE_KEY, millis(self.user_code));
        outputs.put(FULL_CYCLE_KEY, millis(self.full_cycle()));
    }
}
