//! Cycle logger orchestrating capture, replay and fan-out.
//!
//! Provides the [`Logger`] that brackets each control-loop cycle, the
//! [`ReceiverPipeline`] that hands finished cycles to data receivers on a
//! background thread, the [`DiffPublisher`] for live telemetry, dashboard
//! inputs, console capture, hardware collectors and the fixed-period
//! [`CycleRunner`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod clock;
pub mod collector;
pub mod config;
pub mod console;
pub mod dashboard;
pub mod logger;
pub mod pipeline;
pub mod publisher;
pub mod runner;
pub mod timing;

pub use clock::{Clock, MonotonicClock};
pub use collector::{HardwareCollector, SystemStatsCollector};
pub use config::{ConfigError, LoggerConfig, RunnerConfig};
pub use console::{BufferedConsole, ConsoleSource};
pub use dashboard::{
    DashboardBackend, DashboardInput, LoggedBoolean, LoggedChooser, LoggedInput, LoggedNumber,
    LoggedString, MemoryDashboard,
};
pub use logger::{CycleOutcome, Logger, LoggerError, LoggerState};
pub use pipeline::{PushError, ReceiverPipeline, ShutdownReport};
pub use publisher::{ChannelBus, DiffPublisher, TelemetryBus, TelemetryEvent};
pub use runner::{ControlLoop, CycleRunner, RunReport, StopHandle, StopReason};
pub use timing::CycleTiming;
