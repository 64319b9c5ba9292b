//! The cycle logger.
//!
//! [`Logger`] owns the per-cycle entry table and decides, once at
//! [`start`](Logger::start), whether this run records live inputs or
//! replays them from a [`ReplaySource`]. The control loop brackets its
//! own code with [`periodic_before_user`](Logger::periodic_before_user)
//! and [`periodic_after_user`](Logger::periodic_after_user); everything
//! it reads goes through [`process_inputs`](Logger::process_inputs) and
//! everything it computes goes through
//! [`record_output`](Logger::record_output).
//!
//! # Modes
//!
//! | | Recording | Replaying |
//! |-|-|-|
//! | timestamp | live clock | recorded cycle |
//! | inputs | object → table | table → object |
//! | outputs | `/RealOutputs` | `/ReplayOutputs` |
//! | metadata | `/RealMetadata` | `/ReplayMetadata` |
//! | collectors | capture after user code | restore before user code |

use std::sync::Arc;
use std::time::Duration;

use cyclelog_core::keys::{REAL_METADATA, REAL_OUTPUTS, REPLAY_METADATA, REPLAY_OUTPUTS};
use cyclelog_core::{DataReceiver, Loggable, ReceiverError, ReplaySource, Table, Value};
use indexmap::IndexMap;

use crate::clock::{span, Clock, MonotonicClock};
use crate::collector::HardwareCollector;
use crate::config::{ConfigError, LoggerConfig};
use crate::console::{ConsoleSource, CONSOLE_OUTPUT_KEY};
use crate::dashboard::DashboardInput;
use crate::pipeline::{PushError, ReceiverPipeline};
use crate::publisher::{DiffPublisher, TelemetryBus};
use crate::timing::CycleTiming;

// ── Error types ──────────────────────────────────────────────────

/// Errors starting a [`Logger`].
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// `start` was called on a running logger.
    #[error("logger is already running")]
    AlreadyRunning,
    /// The replay source could not be opened or validated.
    #[error("replay source failed to start: {0}")]
    ReplaySource(#[source] ReceiverError),
    /// The replay source holds no cycles at all.
    #[error("replay source contains no cycles")]
    EmptyReplay,
    /// Invalid configuration or thread startup failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ── State ────────────────────────────────────────────────────────

/// Logger lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerState {
    /// Not started, or ended.
    Stopped,
    /// Capturing live inputs.
    Recording,
    /// Feeding recorded inputs back.
    Replaying,
}

/// Result of [`Logger::periodic_before_user`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Run user code for this cycle.
    Continue,
    /// The replay source is exhausted; the logger has ended.
    ReplayFinished,
}

// ── Logger ───────────────────────────────────────────────────────

/// Orchestrates capture, replay and fan-out for one control loop.
///
/// Receivers, the replay source and metadata are configured while
/// stopped; once running they are fixed until [`end`](Logger::end).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use cyclelog_engine::{Logger, LoggerConfig};
///
/// let mut logger = Logger::new(LoggerConfig::default());
/// logger.record_metadata("Project", "intake");
/// logger.start().unwrap();
/// logger.record_output("Arm/Angle", 0.42);
/// logger.periodic_after_user(Duration::from_micros(800), Duration::ZERO);
/// assert!(!logger.receiver_queue_fault());
/// logger.end();
/// ```
pub struct Logger {
    config: LoggerConfig,
    state: LoggerState,
    clock: Arc<dyn Clock>,
    entry: Table,
    outputs: Option<Table>,
    metadata: IndexMap<String, String>,
    receivers: Vec<Box<dyn DataReceiver>>,
    pipeline: Option<ReceiverPipeline>,
    replay_source: Option<Box<dyn ReplaySource>>,
    console: Option<Box<dyn ConsoleSource>>,
    dashboard_inputs: Vec<Box<dyn DashboardInput>>,
    collectors: Vec<Box<dyn HardwareCollector>>,
    timing: CycleTiming,
    cycle_count: u64,
    queue_fault: bool,
    dropped_cycles: u64,
}

impl Logger {
    /// A stopped logger on a [`MonotonicClock`].
    pub fn new(config: LoggerConfig) -> Self {
        Self::with_clock(config, Arc::new(MonotonicClock::new()))
    }

    /// A stopped logger on the given clock.
    pub fn with_clock(config: LoggerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            state: LoggerState::Stopped,
            clock,
            entry: Table::new(0),
            outputs: None,
            metadata: IndexMap::new(),
            receivers: Vec::new(),
            pipeline: None,
            replay_source: None,
            console: None,
            dashboard_inputs: Vec::new(),
            collectors: Vec::new(),
            timing: CycleTiming::default(),
            cycle_count: 0,
            queue_fault: false,
            dropped_cycles: 0,
        }
    }

    fn configurable(&self, what: &str) -> bool {
        if self.state != LoggerState::Stopped {
            tracing::warn!("cannot {what} while the logger is running");
            return false;
        }
        true
    }

    // ── Configuration ───────────────────────────────────────────

    /// Add a sink for finished cycles. Ignored while running.
    pub fn add_receiver(&mut self, receiver: impl DataReceiver + 'static) -> bool {
        if !self.configurable("add a data receiver") {
            return false;
        }
        self.receivers.push(Box::new(receiver));
        true
    }

    /// Publish each cycle's changes to `bus` under the configured
    /// [`telemetry_root`](LoggerConfig::telemetry_root). Ignored while
    /// running.
    pub fn add_telemetry_bus(&mut self, bus: impl TelemetryBus + 'static) -> bool {
        let publisher = DiffPublisher::new(&self.config.telemetry_root, bus);
        self.add_receiver(publisher)
    }

    /// Replay from `source` instead of recording. Ignored while running.
    pub fn set_replay_source(&mut self, source: impl ReplaySource + 'static) -> bool {
        if !self.configurable("set the replay source") {
            return false;
        }
        self.replay_source = Some(Box::new(source));
        true
    }

    /// Record a metadata string, written once at start. Ignored while
    /// running.
    pub fn record_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        if !self.configurable("record metadata") {
            return false;
        }
        self.metadata.insert(key.into(), value.into());
        true
    }

    /// Capture console text into the `Console` output each cycle.
    pub fn set_console_source(&mut self, console: impl ConsoleSource + 'static) {
        self.console = Some(Box::new(console));
    }

    /// Update `input` every cycle before user code.
    pub fn register_dashboard_input(&mut self, input: impl DashboardInput + 'static) {
        self.dashboard_inputs.push(Box::new(input));
    }

    /// Capture or restore a device every cycle.
    pub fn register_collector(&mut self, collector: impl HardwareCollector + 'static) {
        self.collectors.push(Box::new(collector));
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Start recording, or replaying if a replay source was set.
    ///
    /// Opens the replay source, writes metadata, spawns the receiver
    /// pipeline and runs the first
    /// [`periodic_before_user`](Logger::periodic_before_user).
    pub fn start(&mut self) -> Result<(), LoggerError> {
        if self.state != LoggerState::Stopped {
            return Err(LoggerError::AlreadyRunning);
        }
        self.config.validate()?;

        let replaying = self.replay_source.is_some();
        if let Some(source) = self.replay_source.as_mut() {
            if let Err(err) = source.start() {
                tracing::error!("replay source failed to start: {err}");
                self.replay_source = None;
                return Err(LoggerError::ReplaySource(err));
            }
        }

        self.entry = Table::new(0);
        self.cycle_count = 0;
        self.timing = CycleTiming::default();

        let (outputs, metadata) = if replaying {
            (REPLAY_OUTPUTS, REPLAY_METADATA)
        } else {
            (REAL_OUTPUTS, REAL_METADATA)
        };
        self.outputs = Some(self.entry.subtable(outputs));
        let metadata_table = self.entry.subtable(metadata);
        for (key, value) in &self.metadata {
            metadata_table.put(key, value.as_str());
        }

        let receivers = std::mem::take(&mut self.receivers);
        match ReceiverPipeline::spawn(receivers, self.config.receiver_queue_capacity) {
            Ok(pipeline) => self.pipeline = Some(pipeline),
            Err(err) => {
                self.outputs = None;
                if let Some(mut source) = self.replay_source.take() {
                    source.end();
                }
                return Err(err.into());
            }
        }

        self.state = if replaying {
            LoggerState::Replaying
        } else {
            LoggerState::Recording
        };
        self.queue_fault = false;
        self.dropped_cycles = 0;
        tracing::info!(replaying, "logger started");

        match self.periodic_before_user() {
            CycleOutcome::Continue => Ok(()),
            CycleOutcome::ReplayFinished => Err(LoggerError::EmptyReplay),
        }
    }

    /// Stop the run: drain and join the receiver pipeline, close the
    /// replay source. Idempotent.
    pub fn end(&mut self) {
        if self.state == LoggerState::Stopped {
            return;
        }
        self.state = LoggerState::Stopped;
        self.outputs = None;
        if let Some(mut pipeline) = self.pipeline.take() {
            let report = pipeline.shutdown();
            if !report.joined {
                tracing::error!("receiver thread panicked");
            }
            tracing::info!(delivered = report.delivered, "logger ended");
        }
        if let Some(mut source) = self.replay_source.take() {
            source.end();
        }
    }

    // ── Per cycle ───────────────────────────────────────────────

    /// Begin a cycle: stamp or replay the entry table, restore replayed
    /// collectors, update dashboard inputs.
    pub fn periodic_before_user(&mut self) -> CycleOutcome {
        self.cycle_count += 1;
        if self.state == LoggerState::Stopped {
            return CycleOutcome::Continue;
        }

        let entry_start = self.clock.now_us();
        match self.state {
            LoggerState::Recording => self.entry.set_timestamp(entry_start),
            LoggerState::Replaying => {
                let advanced = match self.replay_source.as_mut() {
                    Some(source) => source.update_table(&self.entry),
                    None => Ok(false),
                };
                match advanced {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::info!("replay source exhausted");
                        self.end();
                        return CycleOutcome::ReplayFinished;
                    }
                    Err(err) => {
                        tracing::error!("replay source failed: {err}");
                        self.end();
                        return CycleOutcome::ReplayFinished;
                    }
                }
            }
            LoggerState::Stopped => {}
        }
        let collectors_start = self.clock.now_us();

        let replaying = self.state == LoggerState::Replaying;
        if replaying {
            for collector in &mut self.collectors {
                let table = self.entry.subtable(collector.name());
                collector.replay_from_log(&table);
            }
        }
        let dashboard_start = self.clock.now_us();

        for input in &mut self.dashboard_inputs {
            input.periodic(&self.entry, replaying);
        }
        let dashboard_end = self.clock.now_us();

        self.timing = CycleTiming {
            entry_update: span(entry_start, collectors_start),
            collectors: span(collectors_start, dashboard_start),
            dashboard_inputs: span(dashboard_start, dashboard_end),
            ..CycleTiming::default()
        };
        CycleOutcome::Continue
    }

    /// Finish a cycle: capture collectors and console, record timing,
    /// hand a snapshot to the receivers.
    ///
    /// `user_code` and `before_user` are the caller's measurements of
    /// its own code and of the preceding
    /// [`periodic_before_user`](Logger::periodic_before_user) call.
    pub fn periodic_after_user(&mut self, user_code: Duration, before_user: Duration) {
        if self.state == LoggerState::Stopped {
            return;
        }
        let after_start = self.clock.now_us();

        if self.state == LoggerState::Recording {
            for collector in &mut self.collectors {
                let table = self.entry.subtable(collector.name());
                collector.save_to_log(&table);
            }
        }
        let console_start = self.clock.now_us();

        if self.config.enable_console {
            if let Some(console) = self.console.as_mut() {
                let text = console.take_new_data();
                if !text.is_empty() {
                    self.record_output(CONSOLE_OUTPUT_KEY, text);
                }
            }
        }
        let console_end = self.clock.now_us();

        let queued = self.pipeline.as_ref().map_or(0, ReceiverPipeline::len);
        self.timing.collectors += span(after_start, console_start);
        self.timing.console = span(console_start, console_end);
        self.timing.before_user = before_user;
        self.timing.user_code = user_code;
        self.timing.after_user = span(after_start, console_end);
        self.timing.queued_cycles = queued;
        if self.config.record_timing {
            if let Some(outputs) = &self.outputs {
                self.timing.record(outputs);
            }
        }

        if let Some(pipeline) = &self.pipeline {
            if let Err(err) = pipeline.try_push(self.entry.deep_copy()) {
                self.queue_fault = true;
                self.dropped_cycles += 1;
                match err {
                    PushError::QueueFull => tracing::error!(
                        "receiver queue capacity exceeded, data will not be logged"
                    ),
                    PushError::Disconnected => {
                        tracing::error!("receiver thread is gone, data will not be logged")
                    }
                }
            }
        }
    }

    // ── Data access ─────────────────────────────────────────────

    /// Log `inputs` under `key` (recording) or overwrite it from the
    /// recorded cycle (replaying). No-op while stopped.
    pub fn process_inputs(&self, key: &str, inputs: &mut dyn Loggable) {
        match self.state {
            LoggerState::Recording => {
                self.entry.put_loggable(key, &*inputs);
            }
            LoggerState::Replaying => self.entry.read_loggable(key, inputs),
            LoggerState::Stopped => {}
        }
    }

    /// Write an output under the run's output scope. Returns whether the
    /// value was stored; always false while stopped.
    pub fn record_output(&self, key: &str, value: impl Into<Value>) -> bool {
        match &self.outputs {
            Some(outputs) => outputs.put(key, value),
            None => false,
        }
    }

    /// The output scope while running, for structured writes such as
    /// [`Table::put_struct`] or [`Table::put_measure`].
    pub fn outputs(&self) -> Option<&Table> {
        self.outputs.as_ref()
    }

    /// The current cycle's logical time while running, the live clock
    /// otherwise.
    pub fn timestamp(&self) -> i64 {
        match self.state {
            LoggerState::Stopped => self.clock.now_us(),
            _ => self.entry.timestamp(),
        }
    }

    /// Call `f` on every `n`th cycle. `n == 0` never calls.
    pub fn run_every_n(&self, n: u64, f: impl FnOnce()) {
        if n != 0 && self.cycle_count % n == 0 {
            f();
        }
    }

    // ── Introspection ───────────────────────────────────────────

    /// Lifecycle state.
    pub fn state(&self) -> LoggerState {
        self.state
    }

    /// Whether the logger is recording or replaying.
    pub fn is_running(&self) -> bool {
        self.state != LoggerState::Stopped
    }

    /// Whether a replay source is configured or in use.
    pub fn has_replay_source(&self) -> bool {
        self.replay_source.is_some()
    }

    /// The entry table. Its timestamp may be read from any thread.
    pub fn entry(&self) -> &Table {
        &self.entry
    }

    /// The clock used for stamping and timing.
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Calls to `periodic_before_user` so far.
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Set once any cycle has been dropped this run.
    pub fn receiver_queue_fault(&self) -> bool {
        self.queue_fault
    }

    /// Cycles dropped this run.
    pub fn dropped_cycles(&self) -> u64 {
        self.dropped_cycles
    }

    /// Snapshots waiting for the receivers.
    pub fn queued_cycles(&self) -> usize {
        self.pipeline.as_ref().map_or(0, ReceiverPipeline::len)
    }

    /// Timing of the most recent cycle.
    pub fn timing(&self) -> &CycleTiming {
        &self.timing
    }

    /// The configuration.
    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.end();
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("state", &self.state)
            .field("cycle_count", &self.cycle_count)
            .field("queue_fault", &self.queue_fault)
            .field("dropped_cycles", &self.dropped_cycles)
            .finish_non_exhaustive()
    }
}
