//! Log writer.
//!
//! [`LogWriter`] streams tables to any `Write` sink. The header and the
//! `/Timestamp` entry are written immediately on construction.

use std::io::Write;

use cyclelog_core::keys::TIMESTAMP_KEY;
use cyclelog_core::{LoggableType, Table, Value, ValueData};
use indexmap::IndexMap;

use crate::codec::{encode_header, encode_payload, encode_record};
use crate::error::LogError;
use crate::metadata::EntryMetadata;
use crate::types::Record;

#[derive(Debug)]
struct EntryState {
    id: u32,
    type_name: String,
    unit: Option<String>,
}

/// Writes cycles to a byte stream.
///
/// Generic over `W: Write` so tests can use `Vec<u8>` and production
/// code can use `BufWriter<File>`.
///
/// Each key gets an entry id the first time it is seen. A cycle is one
/// `/Timestamp` record plus one record for every field that is new or
/// whose value, unit or type changed since the previous cycle; the reader
/// carries unchanged fields forward.
///
/// # Examples
///
/// ```
/// use cyclelog_core::Table;
/// use cyclelog_wpilog::{LogReader, LogWriter, EXTRA_HEADER};
///
/// let table = Table::new(1_000);
/// table.put("Enabled", true);
///
/// let mut buf = Vec::new();
/// let mut writer = LogWriter::new(&mut buf, EXTRA_HEADER).unwrap();
/// writer.write_table(&table).unwrap();
/// table.set_timestamp(2_000);
/// writer.write_table(&table).unwrap();
/// assert_eq!(writer.cycles_written(), 2);
/// drop(writer);
///
/// let cycles: Vec<_> = LogReader::open(buf.as_slice())
///     .unwrap()
///     .cycles()
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(cycles.len(), 2);
/// assert_eq!(cycles[1].timestamp(), 2_000);
/// assert!(cycles[1].get("Enabled", false));
/// ```
pub struct LogWriter<W: Write> {
    writer: W,
    entries: IndexMap<String, EntryState>,
    last: IndexMap<String, Value>,
    next_id: u32,
    timestamp_id: u32,
    cycles_written: u64,
    records_written: u64,
}

/// Clamp a table timestamp onto the unsigned wire timestamp.
pub(crate) fn wire_timestamp(timestamp: i64) -> u64 {
    u64::try_from(timestamp).unwrap_or(0)
}

fn unchanged(previous: &Value, current: &Value) -> bool {
    previous == current
        && previous.unit() == current.unit()
        && previous.custom_type() == current.custom_type()
}

impl<W: Write> LogWriter<W> {
    /// Create a new log writer, immediately writing the header.
    pub fn new(mut writer: W, extra_header: &str) -> Result<Self, LogError> {
        encode_header(&mut writer, extra_header)?;
        let mut this = Self {
            writer,
            entries: IndexMap::new(),
            last: IndexMap::new(),
            next_id: 1,
            timestamp_id: 0,
            cycles_written: 0,
            records_written: 0,
        };
        this.timestamp_id = this.start_entry(TIMESTAMP_KEY, LoggableType::Integer.wire_type(), None, 0)?;
        Ok(this)
    }

    fn emit(&mut self, record: &Record) -> Result<(), LogError> {
        encode_record(&mut self.writer, record)?;
        self.records_written += 1;
        Ok(())
    }

    fn start_entry(
        &mut self,
        name: &str,
        type_name: &str,
        unit: Option<&str>,
        timestamp: u64,
    ) -> Result<u32, LogError> {
        let id = self.next_id;
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| LogError::malformed("entry ids exhausted"))?;
        self.emit(&Record::Start {
            entry: id,
            name: name.to_owned(),
            type_name: type_name.to_owned(),
            metadata: EntryMetadata::new(unit).to_json(),
            timestamp,
        })?;
        self.entries.insert(
            name.to_owned(),
            EntryState {
                id,
                type_name: type_name.to_owned(),
                unit: unit.map(str::to_owned),
            },
        );
        Ok(id)
    }

    /// Entry id for `key`, declaring or re-declaring the entry as needed.
    fn entry_for(&mut self, key: &str, value: &Value, timestamp: u64) -> Result<u32, LogError> {
        let type_name = value.wire_type();
        let unit = value.unit();
        match self.entries.get_mut(key) {
            Some(state) if state.type_name == type_name => {
                if state.unit.as_deref() != unit {
                    state.unit = unit.map(str::to_owned);
                    let id = state.id;
                    self.emit(&Record::SetMetadata {
                        entry: id,
                        metadata: EntryMetadata::new(unit).to_json(),
                        timestamp,
                    })?;
                    return Ok(id);
                }
                Ok(state.id)
            }
            Some(state) => {
                let old = state.id;
                self.emit(&Record::Finish {
                    entry: old,
                    timestamp,
                })?;
                let type_name = type_name.to_owned();
                self.start_entry(key, &type_name, unit, timestamp)
            }
            None => {
                let type_name = type_name.to_owned();
                self.start_entry(key, &type_name, unit, timestamp)
            }
        }
    }

    /// Write one cycle: the table's timestamp and every changed field.
    pub fn write_table(&mut self, table: &Table) -> Result<(), LogError> {
        let timestamp = wire_timestamp(table.timestamp());
        let ts_payload = encode_payload(&ValueData::Integer(table.timestamp()))?;
        self.emit(&Record::Data {
            entry: self.timestamp_id,
            timestamp,
            payload: ts_payload,
        })?;

        for (key, value) in table.get_all(false) {
            if key == TIMESTAMP_KEY {
                continue;
            }
            if self.last.get(&key).is_some_and(|prev| unchanged(prev, &value)) {
                continue;
            }
            let entry = self.entry_for(&key, &value, timestamp)?;
            let payload = encode_payload(value.data())?;
            self.emit(&Record::Data {
                entry,
                timestamp,
                payload,
            })?;
            self.last.insert(key, value);
        }
        self.cycles_written += 1;
        Ok(())
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> Result<(), LogError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Number of cycles written so far.
    pub fn cycles_written(&self) -> u64 {
        self.cycles_written
    }

    /// Number of records (control and data) written so far.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Number of entries declared so far, including `/Timestamp`.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Consume the writer and return the underlying `Write` sink.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
