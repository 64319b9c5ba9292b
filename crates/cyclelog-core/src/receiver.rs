//! Collaborator seams: where snapshots go and where replayed cycles
//! come from.

use crate::error::ReceiverError;
use crate::table::Table;

/// A sink for completed cycle snapshots.
///
/// Receivers run on the pipeline's dispatcher thread, never on the
/// control loop. Each receives every snapshot in production order.
pub trait DataReceiver: Send {
    /// Called once before the first snapshot.
    fn start(&mut self) -> Result<(), ReceiverError> {
        Ok(())
    }

    /// Consume one snapshot. `table` is an independent copy owned by the
    /// pipeline; it is never mutated by the control loop.
    fn put_table(&mut self, table: &Table) -> Result<(), ReceiverError>;

    /// Called once after the last snapshot.
    fn end(&mut self) -> Result<(), ReceiverError> {
        Ok(())
    }
}

/// A source of previously recorded cycles.
pub trait ReplaySource: Send {
    /// Open and validate the source. An error here means replay cannot
    /// proceed.
    fn start(&mut self) -> Result<(), ReceiverError>;

    /// Advance `table` to the next recorded cycle, setting its timestamp
    /// and writing every field recorded at that time. Returns `Ok(false)`
    /// once the recording is exhausted.
    fn update_table(&mut self, table: &Table) -> Result<bool, ReceiverError>;

    /// Release resources held by the source.
    fn end(&mut self) {}
}

impl<T: DataReceiver + ?Sized> DataReceiver for Box<T> {
    fn start(&mut self) -> Result<(), ReceiverError> {
        (**self).start()
    }

    fn put_table(&mut self, table: &Table) -> Result<(), ReceiverError> {
        (**self).put_table(table)
    }

    fn end(&mut self) -> Result<(), ReceiverError> {
        (**self).end()
    }
}

impl<T: ReplaySource + ?Sized> ReplaySource for Box<T> {
    fn start(&mut self) -> Result<(), ReceiverError> {
        (**self).start()
    }

    fn update_table(&mut self, table: &Table) -> Result<bool, ReceiverError> {
        (**self).update_table(table)
    }

    fn end(&mut self) {
        (**self).end()
    }
}
