//! Console text capture.
//!
//! A [`ConsoleSource`] hands the logger whatever text appeared since the
//! previous cycle; the logger records it to the `Console` output.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

/// Output key for captured console text.
pub const CONSOLE_OUTPUT_KEY: &str = "Console";

/// A source of console text.
pub trait ConsoleSource: Send {
    /// Text produced since the previous call, without a trailing newline.
    fn take_new_data(&mut self) -> String;
}

/// An in-process console: a shared line buffer that anything holding a
/// clone can write into.
///
/// # Examples
///
/// ```
/// use std::io::Write;
/// use cyclelog_engine::{BufferedConsole, ConsoleSource};
///
/// let mut console = BufferedConsole::new();
/// let mut writer = console.clone();
/// writeln!(writer, "arm homed").unwrap();
/// writer.write_line("intake jammed");
/// assert_eq!(console.take_new_data(), "arm homed\nintake jammed");
/// assert_eq!(console.take_new_data(), "");
/// ```
#[derive(Clone, Debug, Default)]
pub struct BufferedConsole {
    buffer: Arc<Mutex<String>>,
}

impl BufferedConsole {
    /// An empty console.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line.
    pub fn write_line(&self, line: &str) {
        let mut buf = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buf.push_str(line);
        buf.push('\n');
    }
}

impl io::Write for BufferedConsole {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let mut buf = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buf.push_str(&String::from_utf8_lossy(bytes));
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ConsoleSource for BufferedConsole {
    fn take_new_data(&mut self) -> String {
        let mut buf = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut text = std::mem::take(&mut *buf);
        if text.ends_with('\n') {
            text.pop();
        }
        text
    }
}
