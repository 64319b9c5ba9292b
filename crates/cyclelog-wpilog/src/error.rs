//! Error types for the WPILOG codec and its file adapters.

use std::io;

/// Errors raised while writing or reading a binary log.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// An I/O error occurred during read or write.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The stream does not start with `WPILOG`.
    #[error("invalid magic bytes (expected b\"WPILOG\")")]
    InvalidMagic,
    /// The format version is not supported by this build.
    #[error("unsupported format version {found:#06x}")]
    UnsupportedVersion {
        /// The version found in the stream.
        found: u16,
    },
    /// The log was written by some other producer.
    #[error("log was not produced by cyclelog (extra header {extra_header:?})")]
    ForeignLog {
        /// Extra header found in the stream.
        extra_header: String,
    },
    /// A record could not be decoded (truncated or corrupt data).
    #[error("malformed record: {detail}")]
    MalformedRecord {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// A read or write was attempted before `start()`.
    #[error("log not started")]
    NotStarted,
}

impl LogError {
    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedRecord {
            detail: detail.into(),
        }
    }
}
