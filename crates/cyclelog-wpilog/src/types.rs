//! Record types for the WPILOG binary format.

/// Control record type: start a new entry.
pub const CONTROL_START: u8 = 0;
/// Control record type: finish an entry.
pub const CONTROL_FINISH: u8 = 1;
/// Control record type: replace an entry's metadata.
pub const CONTROL_SET_METADATA: u8 = 2;

/// One decoded record.
///
/// Entry id 0 is reserved for control records; every other id refers to
/// an entry declared by an earlier [`Record::Start`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record {
    /// Declare `entry` with its name, wire type and metadata.
    Start {
        /// Id assigned to the entry.
        entry: u32,
        /// Entry name (an absolute table key).
        name: String,
        /// Wire type name.
        type_name: String,
        /// Entry metadata (JSON).
        metadata: String,
        /// Record timestamp in microseconds.
        timestamp: u64,
    },
    /// Retire `entry`; its id may be reused.
    Finish {
        /// Id of the finished entry.
        entry: u32,
        /// Record timestamp in microseconds.
        timestamp: u64,
    },
    /// Replace `entry`'s metadata.
    SetMetadata {
        /// Id of the entry.
        entry: u32,
        /// New metadata (JSON).
        metadata: String,
        /// Record timestamp in microseconds.
        timestamp: u64,
    },
    /// A value for `entry`.
    Data {
        /// Id of the entry.
        entry: u32,
        /// Record timestamp in microseconds.
        timestamp: u64,
        /// Encoded payload.
        payload: Vec<u8>,
    },
}

impl Record {
    /// Record timestamp in microseconds.
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::Start { timestamp, .. }
            | Self::Finish { timestamp, .. }
            | Self::SetMetadata { timestamp, .. }
            | Self::Data { timestamp, .. } => *timestamp,
        }
    }

    /// Whether this is a control record (entry id 0).
    pub fn is_control(&self) -> bool {
        !matches!(self, Self::Data { .. })
    }
}
