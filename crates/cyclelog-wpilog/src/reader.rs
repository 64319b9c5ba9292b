//! Log reader.
//!
//! [`LogReader`] decodes cycles from any `Read` source. The header is
//! validated on construction.

use std::collections::HashMap;
use std::io::Read;

use cyclelog_core::keys::{REPLAY_OUTPUTS, TIMESTAMP_KEY};
use cyclelog_core::{LoggableType, Table, Value, ValueData};

use crate::codec::{decode_header, decode_payload, decode_record};
use crate::error::LogError;
use crate::metadata::EntryMetadata;
use crate::types::Record;
use crate::EXTRA_HEADER;

#[derive(Debug)]
struct EntryInfo {
    name: String,
    ty: LoggableType,
    custom_type: String,
    unit: Option<String>,
}

impl EntryInfo {
    fn new(name: String, type_name: &str, metadata: &str) -> Self {
        let (ty, custom_type) = match LoggableType::from_wire_type(type_name) {
            Some(ty) => (ty, String::new()),
            None if type_name == "json" => (LoggableType::String, type_name.to_owned()),
            None => (LoggableType::Raw, type_name.to_owned()),
        };
        Self {
            name,
            ty,
            custom_type,
            unit: EntryMetadata::parse(metadata).unit,
        }
    }
}

/// Reads cycles from a byte stream.
///
/// Generic over `R: Read` so tests can use `&[u8]` and production code
/// can use `BufReader<File>`.
///
/// A cycle starts at each `/Timestamp` record and holds every data record
/// up to the next one. Fields under `/ReplayOutputs` are never read back.
pub struct LogReader<R: Read> {
    reader: R,
    extra_header: String,
    entries: HashMap<u32, EntryInfo>,
    pending: Option<i64>,
    exhausted: bool,
    cycles_read: u64,
}

impl<R: Read> LogReader<R> {
    /// Open a log stream, reading and validating the header.
    ///
    /// Fails with [`LogError::ForeignLog`] unless the log was written
    /// with [`EXTRA_HEADER`].
    pub fn open(mut reader: R) -> Result<Self, LogError> {
        let extra_header = decode_header(&mut reader)?;
        if extra_header != EXTRA_HEADER {
            return Err(LogError::ForeignLog { extra_header });
        }
        Ok(Self {
            reader,
            extra_header,
            entries: HashMap::new(),
            pending: None,
            exhausted: false,
            cycles_read: 0,
        })
    }

    /// Extra header from the log.
    pub fn extra_header(&self) -> &str {
        &self.extra_header
    }

    /// Number of cycles read so far.
    pub fn cycles_read(&self) -> u64 {
        self.cycles_read
    }

    /// Apply a control record. A finished entry's key is removed from
    /// `table` so a re-declared entry may carry a new type.
    fn apply_control(&mut self, record: Record, table: &Table) {
        match record {
            Record::Start {
                entry,
                name,
                type_name,
                metadata,
                ..
            } => {
                self.entries
                    .insert(entry, EntryInfo::new(name, &type_name, &metadata));
            }
            Record::Finish { entry, .. } => {
                if let Some(info) = self.entries.remove(&entry) {
                    table.remove(Self::relative_key(&info.name));
                }
            }
            Record::SetMetadata {
                entry, metadata, ..
            } => {
                if let Some(info) = self.entries.get_mut(&entry) {
                    info.unit = EntryMetadata::parse(&metadata).unit;
                }
            }
            Record::Data { .. } => {}
        }
    }

    fn relative_key(name: &str) -> &str {
        name.strip_prefix('/').unwrap_or(name)
    }

    fn timestamp_of(info: &EntryInfo, payload: &[u8]) -> Result<Option<i64>, LogError> {
        if info.name != TIMESTAMP_KEY {
            return Ok(None);
        }
        match decode_payload(LoggableType::Integer, payload)? {
            ValueData::Integer(ts) => Ok(Some(ts)),
            _ => Err(LogError::malformed("timestamp record is not int64")),
        }
    }

    /// Skip to the first `/Timestamp` record, or `None` at end of stream.
    fn seek_timestamp(&mut self, table: &Table) -> Result<Option<i64>, LogError> {
        while let Some(record) = decode_record(&mut self.reader)? {
            if let Record::Data { entry, payload, .. } = &record {
                if let Some(info) = self.entries.get(entry) {
                    if let Some(ts) = Self::timestamp_of(info, payload)? {
                        return Ok(Some(ts));
                    }
                }
                continue;
            }
            self.apply_control(record, table);
        }
        Ok(None)
    }

    /// Advance `table` by one cycle.
    ///
    /// Sets the table's timestamp and writes every field recorded in the
    /// cycle; fields not recorded keep their previous values. Keys are
    /// written relative to `table`'s prefix, normally the root. Returns
    /// `Ok(false)` once the stream is exhausted.
    pub fn update_table(&mut self, table: &Table) -> Result<bool, LogError> {
        if self.exhausted {
            return Ok(false);
        }
        let timestamp = match self.pending.take() {
            Some(ts) => ts,
            None => match self.seek_timestamp(table)? {
                Some(ts) => ts,
                None => {
                    self.exhausted = true;
                    return Ok(false);
                }
            },
        };
        table.set_timestamp(timestamp);

        loop {
            let Some(record) = decode_record(&mut self.reader)? else {
                self.exhausted = true;
                break;
            };
            let Record::Data { entry, payload, .. } = record else {
                self.apply_control(record, table);
                continue;
            };
            let Some(info) = self.entries.get(&entry) else {
                tracing::debug!(entry, "data record for undeclared entry skipped");
                continue;
            };
            if let Some(next) = Self::timestamp_of(info, &payload)? {
                self.pending = Some(next);
                break;
            }
            let key = Self::relative_key(&info.name);
            if key
                .strip_prefix(REPLAY_OUTPUTS)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            {
                continue;
            }
            let data = decode_payload(info.ty, &payload)?;
            let mut value = Value::new(data).with_custom_type(info.custom_type.as_str());
            if let Some(unit) = &info.unit {
                value = value.with_unit(unit.as_str());
            }
            table.put_value(key, value);
        }
        self.cycles_read += 1;
        Ok(true)
    }

    /// Convert into an iterator of independent per-cycle snapshots.
    pub fn cycles(self) -> CycleIter<R> {
        CycleIter {
            reader: self,
            table: Table::new(0),
            done: false,
        }
    }
}

/// Iterator adapter over decoded cycles.
///
/// Each item is a deep copy of the accumulated state, so it holds every
/// field live at that cycle.
pub struct CycleIter<R: Read> {
    reader: LogReader<R>,
    table: Table,
    done: bool,
}

impl<R: Read> Iterator for CycleIter<R> {
    type Item = Result<Table, LogError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.update_table(&self.table) {
            Ok(true) => Some(Ok(self.table.deep_copy())),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
