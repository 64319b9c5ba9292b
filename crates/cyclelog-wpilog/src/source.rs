//! File-backed replay source.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use cyclelog_core::{ReceiverError, ReplaySource, Table};

use crate::error::LogError;
use crate::reader::LogReader;

/// Replays cycles from a WPILOG file written by [`WpilogWriter`](crate::WpilogWriter).
pub struct WpilogReader {
    path: PathBuf,
    reader: Option<LogReader<BufReader<File>>>,
}

impl WpilogReader {
    /// A source for the log at `path`. The file is opened by
    /// [`start`](ReplaySource::start).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            reader: None,
        }
    }

    /// Path of the log being replayed.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReplaySource for WpilogReader {
    fn start(&mut self) -> Result<(), ReceiverError> {
        let file = File::open(&self.path).map_err(|e| {
            tracing::error!(path = %self.path.display(), "cannot open replay log: {e}");
            LogError::from(e)
        })?;
        let reader = LogReader::open(BufReader::new(file)).map_err(|e| {
            match &e {
                LogError::ForeignLog { .. } => tracing::error!(
                    path = %self.path.display(),
                    "the replay log was not produced by cyclelog"
                ),
                _ => tracing::error!(
                    path = %self.path.display(),
                    "the replay log is not a valid WPILOG file: {e}"
                ),
            }
            e
        })?;
        tracing::info!(path = %self.path.display(), "replaying log");
        self.reader = Some(reader);
        Ok(())
    }

    fn update_table(&mut self, table: &Table) -> Result<bool, ReceiverError> {
        let reader = self.reader.as_mut().ok_or(LogError::NotStarted)?;
        Ok(reader.update_table(table)?)
    }

    fn end(&mut self) {
        self.reader = None;
    }
}
