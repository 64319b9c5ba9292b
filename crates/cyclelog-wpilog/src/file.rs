//! File-backed log sink.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cyclelog_core::{DataReceiver, ReceiverError, Table};

use crate::error::LogError;
use crate::naming::LogNamer;
use crate::writer::LogWriter;
use crate::EXTRA_HEADER;

/// Where and how [`WpilogWriter`] names its file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WpilogConfig {
    /// A `.wpilog` file path (fixed name) or a folder (auto-named file).
    pub path: PathBuf,
    /// Treat the wall clock as valid from the first cycle.
    pub assume_time_valid: bool,
    /// How long the clock must stay valid before the date is used.
    pub time_valid_delay: Duration,
}

impl WpilogConfig {
    /// Config for `path` with default naming behaviour.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

impl Default for WpilogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("logs"),
            assume_time_valid: false,
            time_valid_delay: Duration::from_secs(5),
        }
    }
}

/// Writes every snapshot to a WPILOG file.
///
/// With a folder path the file starts under a random name and is renamed
/// as date, event and match information arrive (see [`LogNamer`]).
pub struct WpilogWriter {
    folder: PathBuf,
    filename: String,
    namer: Option<LogNamer>,
    writer: Option<LogWriter<BufWriter<File>>>,
}

impl WpilogWriter {
    /// A writer for `config`. Nothing touches the file system until
    /// [`start`](DataReceiver::start).
    pub fn new(config: WpilogConfig) -> Self {
        let is_file = config
            .path
            .extension()
            .is_some_and(|ext| ext == "wpilog");
        if is_file {
            let folder = config
                .path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            let filename = config
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Self {
                folder,
                filename,
                namer: None,
                writer: None,
            }
        } else {
            let namer = LogNamer::new(config.assume_time_valid, config.time_valid_delay);
            Self {
                folder: config.path,
                filename: namer.current_name(),
                namer: Some(namer),
                writer: None,
            }
        }
    }

    /// Current full path of the log file.
    pub fn path(&self) -> PathBuf {
        self.folder.join(&self.filename)
    }

    /// Whether the file is renamed as metadata arrives.
    pub fn auto_rename(&self) -> bool {
        self.namer.is_some()
    }

    fn rename_to(&mut self, name: String) {
        let from = self.path();
        let to = self.folder.join(&name);
        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writer.flush() {
                tracing::error!(path = %from.display(), "failed to flush log before rename: {e}");
            }
        }
        match fs::rename(&from, &to) {
            Ok(()) => {
                tracing::info!(from = %from.display(), to = %to.display(), "renamed log file");
                self.filename = name;
            }
            Err(e) => {
                tracing::error!(from = %from.display(), to = %to.display(), "failed to rename log file: {e}");
            }
        }
    }
}

impl DataReceiver for WpilogWriter {
    fn start(&mut self) -> Result<(), ReceiverError> {
        if !self.folder.as_os_str().is_empty() {
            fs::create_dir_all(&self.folder).map_err(LogError::from)?;
        }
        let path = self.path();
        if path.exists() {
            fs::remove_file(&path).map_err(LogError::from)?;
        }
        let file = File::create(&path).map_err(LogError::from)?;
        self.writer = Some(LogWriter::new(BufWriter::new(file), EXTRA_HEADER)?);
        tracing::info!(path = %path.display(), "logging to file");
        Ok(())
    }

    fn put_table(&mut self, table: &Table) -> Result<(), ReceiverError> {
        let writer = self.writer.as_mut().ok_or(LogError::NotStarted)?;
        writer.write_table(table)?;
        let renamed = self
            .namer
            .as_mut()
            .map(|namer| namer.observe(table, || chrono::Local::now().naive_local()));
        if let Some(name) = renamed {
            if name != self.filename {
                self.rename_to(name);
            }
        }
        Ok(())
    }

    fn end(&mut self) -> Result<(), ReceiverError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}
