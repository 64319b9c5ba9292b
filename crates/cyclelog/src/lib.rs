//! cyclelog: deterministic capture and replay logging for fixed-period
//! control loops.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all cyclelog sub-crates. For most users, adding `cyclelog` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use cyclelog::prelude::*;
//!
//! struct Arm { angle: f64 }
//!
//! impl Loggable for Arm {
//!     fn to_log(&self, table: &Table) { table.put("Angle", self.angle); }
//!     fn from_log(&mut self, table: &Table) { self.angle = table.get("Angle", self.angle); }
//! }
//!
//! struct Robot { arm: Arm }
//!
//! impl ControlLoop for Robot {
//!     fn periodic(&mut self, logger: &mut Logger) {
//!         logger.process_inputs("Arm", &mut self.arm);
//!         logger.record_output("Arm/Setpoint", self.arm.angle + 0.1);
//!     }
//! }
//!
//! let dir = std::env::temp_dir().join("cyclelog-doc");
//! let path = dir.join("quickstart.wpilog");
//!
//! let mut logger = Logger::new(LoggerConfig::default());
//! logger.add_receiver(WpilogWriter::new(WpilogConfig::new(&path)));
//! let mut runner = CycleRunner::new(RunnerConfig {
//!     use_timing: false,
//!     max_cycles: Some(3),
//!     ..RunnerConfig::default()
//! }).unwrap();
//! let report = runner.run(&mut logger, &mut Robot { arm: Arm { angle: 1.0 } }).unwrap();
//! assert_eq!(report.cycles, 3);
//!
//! let mut replay = Logger::new(LoggerConfig::default());
//! replay.set_replay_source(WpilogReader::new(&path));
//! let mut runner = CycleRunner::new(RunnerConfig {
//!     use_timing: false,
//!     ..RunnerConfig::default()
//! }).unwrap();
//! let report = runner.run(&mut replay, &mut Robot { arm: Arm { angle: 0.0 } }).unwrap();
//! assert_eq!(report.reason, StopReason::ReplayFinished);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `cyclelog-core` | `Table`, `Value`, units, loggable traits, receiver seams |
//! | [`wpilog`] | `cyclelog-wpilog` | WPILOG codec, file sink, replay source, naming |
//! | [`engine`] | `cyclelog-engine` | `Logger`, receiver pipeline, live publisher, runner |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits and reserved keys (`cyclelog-core`).
///
/// Contains the per-cycle [`types::Table`], the typed [`types::Value`],
/// and the collaborator traits [`types::DataReceiver`] and
/// [`types::ReplaySource`].
pub use cyclelog_core as types;

/// WPILOG binary logs (`cyclelog-wpilog`).
///
/// Write logs with [`wpilog::WpilogWriter`], replay them with
/// [`wpilog::WpilogReader`], or iterate cycles offline with
/// [`wpilog::LogReader`].
pub use cyclelog_wpilog as wpilog;

/// Cycle orchestration (`cyclelog-engine`).
///
/// [`engine::Logger`] brackets each cycle; [`engine::CycleRunner`]
/// drives a loop at a fixed period.
pub use cyclelog_engine as engine;

/// Common imports for typical cyclelog usage.
///
/// ```rust
/// use cyclelog::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use cyclelog_core::{
        DataReceiver, LogEnum, Loggable, Measure, ReplaySource, StructSerializable, Table, Unit,
        Value,
    };

    // Errors
    pub use cyclelog_core::TableError;
    pub use cyclelog_engine::{ConfigError, LoggerError};
    pub use cyclelog_wpilog::LogError;

    // Log files
    pub use cyclelog_wpilog::{LogReader, LogWriter, WpilogConfig, WpilogReader, WpilogWriter};

    // Engine
    pub use cyclelog_engine::{
        ChannelBus, ControlLoop, CycleOutcome, CycleRunner, DiffPublisher, Logger, LoggerConfig,
        RunnerConfig, StopReason,
    };
}
