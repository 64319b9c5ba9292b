//! Logger and runner configuration, validation, and error types.
//!
//! [`LoggerConfig`] is the builder input for a [`Logger`](crate::Logger);
//! [`RunnerConfig`] drives a [`CycleRunner`](crate::CycleRunner).
//! [`validate()`](LoggerConfig::validate) checks structural invariants
//! before any thread is spawned.

use std::time::Duration;

// ── LoggerConfig ──────────────────────────────────────────────────

/// Default capacity of the receiver queue, in cycles.
pub const DEFAULT_QUEUE_CAPACITY: usize = 500;

/// Configuration for a [`Logger`](crate::Logger).
#[derive(Clone, Debug)]
pub struct LoggerConfig {
    /// Maximum number of snapshots waiting for the dispatcher thread.
    /// A cycle produced while the queue is full is dropped. Default: 500.
    pub receiver_queue_capacity: usize,
    /// Record console text to the `Console` output each cycle. Default: true.
    pub enable_console: bool,
    /// Root topic name for live telemetry. Default: `"/CycleLog"`.
    pub telemetry_root: String,
    /// Record the `Logger/*` and `LoggedRobot/*` timing outputs. Default: true.
    pub record_timing: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            receiver_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            enable_console: true,
            telemetry_root: "/CycleLog".into(),
            record_timing: true,
        }
    }
}

impl LoggerConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.receiver_queue_capacity == 0 {
            return Err(ConfigError::InvalidQueueCapacity {
                value: self.receiver_queue_capacity,
            });
        }
        if self.telemetry_root.trim_matches('/').is_empty() {
            return Err(ConfigError::EmptyTelemetryRoot);
        }
        Ok(())
    }
}

// ── RunnerConfig ──────────────────────────────────────────────────

/// Configuration for a [`CycleRunner`](crate::CycleRunner).
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    /// Nominal cycle period. Default: 20 ms.
    pub period: Duration,
    /// Sleep until each deadline. When false, cycles run back to back,
    /// which is what replay usually wants. Default: true.
    pub use_timing: bool,
    /// Stop after this many cycles. `None` = run until stopped.
    pub max_cycles: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(20),
            use_timing: true,
            max_cycles: None,
        }
    }
}

impl RunnerConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period.is_zero() {
            return Err(ConfigError::InvalidPeriod {
                period: self.period,
            });
        }
        Ok(())
    }
}

// ── ConfigError ───────────────────────────────────────────────────

/// Errors detected during configuration validation or thread startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The receiver queue must hold at least one cycle.
    #[error("receiver_queue_capacity must be at least 1, got {value}")]
    InvalidQueueCapacity {
        /// The rejected capacity.
        value: usize,
    },
    /// The runner period must be non-zero.
    #[error("cycle period must be non-zero, got {period:?}")]
    InvalidPeriod {
        /// The rejected period.
        period: Duration,
    },
    /// The telemetry root must name something.
    #[error("telemetry root must not be empty")]
    EmptyTelemetryRoot,
    /// The dispatcher thread could not be spawned.
    #[error("failed to spawn receiver thread: {reason}")]
    ThreadSpawnFailed {
        /// OS error description.
        reason: String,
    },
}
