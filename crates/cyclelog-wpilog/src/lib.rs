//! WPILOG binary log codec for cyclelog.
//!
//! Snapshots are written as a self-describing record stream that offline
//! viewers for the WPILOG format can open directly, and read back cycle
//! by cycle for replay.
//!
//! # Architecture
//!
//! - [`LogWriter`] encodes tables to any `Write` sink
//! - [`LogReader`] decodes cycles from any `Read` source
//! - [`WpilogWriter`] is the file-backed [`DataReceiver`](cyclelog_core::DataReceiver)
//! - [`WpilogReader`] is the file-backed [`ReplaySource`](cyclelog_core::ReplaySource)
//!
//! # Format
//!
//! ```text
//! ["WPILOG"] [VERSION u16] [EXTRA_HEADER str]
//! [Record 1] [Record 2] ... [Record N]
//! ```
//!
//! Each cycle is a `/Timestamp` data record followed by one data record
//! per field that changed since the previous cycle.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod file;
pub mod metadata;
pub mod naming;
pub mod path;
pub mod reader;
pub mod source;
pub mod types;
pub mod writer;

pub use error::LogError;
pub use file::{WpilogConfig, WpilogWriter};
pub use metadata::EntryMetadata;
pub use naming::LogNamer;
pub use path::add_path_suffix;
pub use reader::{CycleIter, LogReader};
pub use source::WpilogReader;
pub use types::Record;
pub use writer::LogWriter;

/// Magic bytes at the start of every log.
pub const MAGIC: [u8; 6] = *b"WPILOG";

/// Binary format version (major 1, minor 0).
pub const FORMAT_VERSION: u16 = 0x0100;

/// Extra header identifying logs written by this crate.
pub const EXTRA_HEADER: &str = "cyclelog";

/// Producer tag stored in entry metadata.
pub const SOURCE: &str = "cyclelog";
