//! Error types for table writes and collaborator failures.

/// A write that the table refused to apply.
///
/// Tables never panic on a bad write. The rejected value is dropped, the
/// previous value (if any) is kept, and the error is reported through
/// `tracing` by [`Table::put_value`](crate::Table::put_value).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// The key was first written with a different type.
    #[error("failed to write to field \"{key}\": attempted to write {attempted} value but expected {expected}")]
    TypeMismatch {
        /// Absolute key of the field.
        key: String,
        /// Wire type the field was declared with.
        expected: String,
        /// Wire type of the rejected write.
        attempted: String,
    },
    /// A nested object write exceeded the recursion limit.
    #[error("recursive table structure detected when logging to field \"{key}\" at depth {depth}")]
    RecursionLimit {
        /// Absolute key of the nested object.
        key: String,
        /// Depth of the table the write was attempted through.
        depth: u32,
    },
}

/// Failure reported by a data receiver or replay source.
///
/// Collaborators live in other crates with their own error types, so the
/// seam carries a boxed error.
pub type ReceiverError = Box<dyn std::error::Error + Send + Sync + 'static>;
