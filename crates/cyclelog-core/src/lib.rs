//! Core types and traits for cyclelog.
//!
//! This is the leaf crate with no internal dependencies. It defines the
//! per-cycle [`Table`], the typed [`Value`] it stores, the conversion
//! traits for enums, structs, units and nested objects, and the two
//! collaborator seams ([`DataReceiver`], [`ReplaySource`]) through which
//! snapshots leave the control loop and recorded cycles come back in.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod keys;
pub mod loggable;
pub mod receiver;
pub mod table;
pub mod units;
pub mod value;

pub use error::{ReceiverError, TableError};
pub use loggable::{LogEnum, Loggable, StructSerializable};
pub use receiver::{DataReceiver, ReplaySource};
pub use table::Table;
pub use units::{Dimension, Measure, Unit};
pub use value::{FromValue, LoggableType, Value, ValueData};
