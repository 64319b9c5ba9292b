//! Reserved keys and namespaces.

/// Key carrying the 64-bit integer cycle timestamp (microseconds).
pub const TIMESTAMP_KEY: &str = "/Timestamp";

/// Output namespace in record mode.
pub const REAL_OUTPUTS: &str = "RealOutputs";

/// Output namespace in replay mode. Never re-ingested from a log.
pub const REPLAY_OUTPUTS: &str = "ReplayOutputs";

/// Metadata namespace in record mode.
pub const REAL_METADATA: &str = "RealMetadata";

/// Metadata namespace in replay mode.
pub const REPLAY_METADATA: &str = "ReplayMetadata";

/// Prefix of struct schema entries; the struct type string follows.
pub const SCHEMA_PREFIX: &str = "/.schema/";

/// Custom type of struct schema entries.
pub const SCHEMA_TYPE: &str = "structschema";

/// Namespace echoing dashboard inputs.
pub const NETWORK_INPUTS: &str = "NetworkInputs";

/// Maximum table depth for nested object writes.
pub const MAX_DEPTH: u32 = 100;
