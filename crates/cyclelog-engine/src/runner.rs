//! Fixed-period control loop driver.
//!
//! [`CycleRunner`] owns the cycle cadence: wait for the next deadline,
//! open the cycle, run user code, close the cycle. If a cycle overruns,
//! the next deadline is reset to now rather than trying to catch up with
//! a burst of short cycles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::clock::span;
use crate::config::{ConfigError, RunnerConfig};
use crate::logger::{CycleOutcome, Logger, LoggerError};

/// User code driven by a [`CycleRunner`].
pub trait ControlLoop {
    /// Runs once after the logger starts, inside the first cycle.
    fn init(&mut self, _logger: &mut Logger) {}

    /// Runs once per cycle between the logger's before and after calls.
    fn periodic(&mut self, logger: &mut Logger);

    /// Runs once after the last cycle, before the logger ends.
    fn end(&mut self, _logger: &mut Logger) {}
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The replay source ran out of cycles.
    ReplayFinished,
    /// [`StopHandle::stop`] was called.
    Stopped,
    /// `max_cycles` cycles completed.
    MaxCycles,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Cycles whose user code ran.
    pub cycles: u64,
    /// Cycles that started after their deadline.
    pub late_cycles: u64,
    /// Why the run ended.
    pub reason: StopReason,
}

/// Cloneable handle that asks a running [`CycleRunner`] to stop after
/// the current cycle.
#[derive(Clone, Debug, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    /// Request a stop.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether a stop was requested.
    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Drives a [`ControlLoop`] through a [`Logger`] at a fixed period.
#[derive(Debug)]
pub struct CycleRunner {
    config: RunnerConfig,
    stop: StopHandle,
}

impl CycleRunner {
    /// A runner with a validated configuration.
    pub fn new(config: RunnerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            stop: StopHandle::default(),
        })
    }

    /// A handle for stopping the run from user code or another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// The configuration.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Start `logger`, run `control` until a stop condition, then end
    /// both.
    pub fn run(
        &mut self,
        logger: &mut Logger,
        control: &mut dyn ControlLoop,
    ) -> Result<RunReport, LoggerError> {
        let clock = logger.clock();
        let period_us = i64::try_from(self.config.period.as_micros()).unwrap_or(i64::MAX);

        let start_begin = clock.now_us();
        logger.start()?;
        let mut before = span(start_begin, clock.now_us());
        control.init(logger);

        let mut next_cycle_us = clock.now_us();
        let mut cycles = 0u64;
        let mut late_cycles = 0u64;
        let mut first = true;

        let reason = loop {
            if self.stop.is_stopped() {
                break StopReason::Stopped;
            }
            if self.config.max_cycles.is_some_and(|max| cycles >= max) {
                break StopReason::MaxCycles;
            }

            if self.config.use_timing {
                let now = clock.now_us();
                if next_cycle_us < now {
                    if !first {
                        late_cycles += 1;
                    }
                    next_cycle_us = now;
                } else {
                    clock.sleep_until(next_cycle_us);
                }
                next_cycle_us = next_cycle_us.saturating_add(period_us);
            }

            if !first {
                let before_start = clock.now_us();
                if logger.periodic_before_user() == CycleOutcome::ReplayFinished {
                    break StopReason::ReplayFinished;
                }
                before = span(before_start, clock.now_us());
            }
            first = false;

            let user_start = clock.now_us();
            control.periodic(logger);
            let user_code = span(user_start, clock.now_us());

            logger.periodic_after_user(user_code, before);
            cycles += 1;
        };

        control.end(logger);
        logger.end();
        tracing::info!(cycles, late_cycles, ?reason, "run finished");
        Ok(RunReport {
            cycles,
            late_cycles,
            reason,
        })
    }
}
