//! Binary encode/decode for the WPILOG format.
//!
//! All integers are little-endian. The header is the magic `WPILOG`, a
//! `u16` version and a `u32`-length-prefixed extra header string. Each
//! record starts with one bitfield byte giving the byte widths of the
//! entry id (1-4), payload size (1-4) and timestamp (1-8) that follow,
//! then the payload itself.

use std::io::{Read, Write};

use cyclelog_core::{LoggableType, ValueData};

use crate::error::LogError;
use crate::types::{Record, CONTROL_FINISH, CONTROL_SET_METADATA, CONTROL_START};
use crate::{FORMAT_VERSION, MAGIC};

// ── Primitive writers ───────────────────────────────────────────

/// Write a little-endian u16.
pub fn write_u16_le(w: &mut dyn Write, v: u16) -> Result<(), LogError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), LogError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write the low `width` bytes of `v`, little-endian.
pub fn write_varint_le(w: &mut dyn Write, v: u64, width: usize) -> Result<(), LogError> {
    w.write_all(&v.to_le_bytes()[..width])?;
    Ok(())
}

fn len_u32(len: usize) -> Result<u32, LogError> {
    u32::try_from(len).map_err(|_| LogError::malformed(format!("length {len} exceeds u32")))
}

/// Write a length-prefixed UTF-8 string (u32 length + bytes).
pub fn write_length_prefixed_str(w: &mut dyn Write, s: &str) -> Result<(), LogError> {
    write_u32_le(w, len_u32(s.len())?)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

/// Smallest number of bytes (at least one) that holds `v`.
pub fn byte_width(v: u64) -> usize {
    let bits = 64 - v.leading_zeros() as usize;
    bits.div_ceil(8).max(1)
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a little-endian u16.
pub fn read_u16_le(r: &mut dyn Read) -> Result<u16, LogError> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn Read) -> Result<u32, LogError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a `width`-byte little-endian unsigned integer.
pub fn read_varint_le(r: &mut dyn Read, width: usize) -> Result<u64, LogError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf[..width])?;
    Ok(u64::from_le_bytes(buf))
}

/// Read a length-prefixed UTF-8 string.
pub fn read_length_prefixed_str(r: &mut dyn Read) -> Result<String, LogError> {
    let len = read_u32_le(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| LogError::malformed(format!("invalid UTF-8 string: {e}")))
}

// ── Header encode/decode ────────────────────────────────────────

/// Encode the file header.
pub fn encode_header(w: &mut dyn Write, extra_header: &str) -> Result<(), LogError> {
    w.write_all(&MAGIC)?;
    write_u16_le(w, FORMAT_VERSION)?;
    write_length_prefixed_str(w, extra_header)?;
    Ok(())
}

/// Decode the file header, returning the extra header string.
///
/// Any 1.x version is accepted.
pub fn decode_header(r: &mut dyn Read) -> Result<String, LogError> {
    let mut magic = [0u8; 6];
    r.read_exact(&mut magic).map_err(|_| LogError::InvalidMagic)?;
    if magic != MAGIC {
        return Err(LogError::InvalidMagic);
    }
    let version = read_u16_le(r)?;
    if version >> 8 != FORMAT_VERSION >> 8 {
        return Err(LogError::UnsupportedVersion { found: version });
    }
    read_length_prefixed_str(r)
}

// ── Record encode/decode ────────────────────────────────────────

fn encode_raw_record(
    w: &mut dyn Write,
    entry: u32,
    timestamp: u64,
    payload: &[u8],
) -> Result<(), LogError> {
    let size = len_u32(payload.len())?;
    let entry_w = byte_width(u64::from(entry));
    let size_w = byte_width(u64::from(size));
    let ts_w = byte_width(timestamp);
    // Widths are 1-4, 1-4 and 1-8, so each fits its field.
    let header = ((entry_w - 1) | ((size_w - 1) << 2) | ((ts_w - 1) << 4)) as u8;
    w.write_all(&[header])?;
    write_varint_le(w, u64::from(entry), entry_w)?;
    write_varint_le(w, u64::from(size), size_w)?;
    write_varint_le(w, timestamp, ts_w)?;
    w.write_all(payload)?;
    Ok(())
}

fn push_str(buf: &mut Vec<u8>, s: &str) -> Result<(), LogError> {
    buf.extend_from_slice(&len_u32(s.len())?.to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

/// Encode one record.
pub fn encode_record(w: &mut dyn Write, record: &Record) -> Result<(), LogError> {
    match record {
        Record::Start {
            entry,
            name,
            type_name,
            metadata,
            timestamp,
        } => {
            let mut payload = vec![CONTROL_START];
            payload.extend_from_slice(&entry.to_le_bytes());
            push_str(&mut payload, name)?;
            push_str(&mut payload, type_name)?;
            push_str(&mut payload, metadata)?;
            encode_raw_record(w, 0, *timestamp, &payload)
        }
        Record::Finish { entry, timestamp } => {
            let mut payload = vec![CONTROL_FINISH];
            payload.extend_from_slice(&entry.to_le_bytes());
            encode_raw_record(w, 0, *timestamp, &payload)
        }
        Record::SetMetadata {
            entry,
            metadata,
            timestamp,
        } => {
            let mut payload = vec![CONTROL_SET_METADATA];
            payload.extend_from_slice(&entry.to_le_bytes());
            push_str(&mut payload, metadata)?;
            encode_raw_record(w, 0, *timestamp, &payload)
        }
        Record::Data {
            entry,
            timestamp,
            payload,
        } => {
            if *entry == 0 {
                return Err(LogError::malformed("data record cannot use entry id 0"));
            }
            encode_raw_record(w, *entry, *timestamp, payload)
        }
    }
}

/// Decode one record.
///
/// Returns `Ok(None)` on clean EOF (no bytes available), `Ok(Some(record))`
/// on success, or an error on truncated/corrupt data.
pub fn decode_record(r: &mut dyn Read) -> Result<Option<Record>, LogError> {
    let mut header = [0u8; 1];
    loop {
        match r.read(&mut header) {
            Ok(0) => return Ok(None),
            Ok(_) => break,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(LogError::Io(e)),
        }
    }
    let header = header[0];
    if header & 0x80 != 0 {
        return Err(LogError::malformed(format!(
            "reserved header bit set in {header:#04x}"
        )));
    }
    let entry_w = usize::from(header & 0x3) + 1;
    let size_w = usize::from((header >> 2) & 0x3) + 1;
    let ts_w = usize::from((header >> 4) & 0x7) + 1;

    let entry = truncated(read_varint_le(r, entry_w), "entry id")? as u32;
    let size = truncated(read_varint_le(r, size_w), "payload size")? as usize;
    let timestamp = truncated(read_varint_le(r, ts_w), "timestamp")?;
    let mut payload = vec![0u8; size];
    truncated(r.read_exact(&mut payload).map_err(LogError::from), "payload")?;

    if entry != 0 {
        return Ok(Some(Record::Data {
            entry,
            timestamp,
            payload,
        }));
    }
    decode_control(&payload, timestamp).map(Some)
}

fn truncated<T>(result: Result<T, LogError>, what: &str) -> Result<T, LogError> {
    result.map_err(|e| match e {
        LogError::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            LogError::malformed(format!("truncated record: missing {what}"))
        }
        other => other,
    })
}

fn decode_control(payload: &[u8], timestamp: u64) -> Result<Record, LogError> {
    let mut r = payload;
    let kind = *r
        .first()
        .ok_or_else(|| LogError::malformed("empty control record"))?;
    r = &r[1..];
    let entry = truncated(read_u32_le(&mut r), "control entry id")?;
    let record = match kind {
        CONTROL_START => Record::Start {
            entry,
            name: truncated(read_length_prefixed_str(&mut r), "entry name")?,
            type_name: truncated(read_length_prefixed_str(&mut r), "entry type")?,
            metadata: truncated(read_length_prefixed_str(&mut r), "entry metadata")?,
            timestamp,
        },
        CONTROL_FINISH => Record::Finish { entry, timestamp },
        CONTROL_SET_METADATA => Record::SetMetadata {
            entry,
            metadata: truncated(read_length_prefixed_str(&mut r), "entry metadata")?,
            timestamp,
        },
        other => {
            return Err(LogError::malformed(format!(
                "unknown control record type {other}"
            )))
        }
    };
    Ok(record)
}

// ── Payload encode/decode ───────────────────────────────────────

/// Encode a value payload.
pub fn encode_payload(data: &ValueData) -> Result<Vec<u8>, LogError> {
    let mut buf = Vec::new();
    match data {
        ValueData::Raw(v) => buf.extend_from_slice(v),
        ValueData::Boolean(v) => buf.push(u8::from(*v)),
        ValueData::Integer(v) => buf.extend_from_slice(&v.to_le_bytes()),
        ValueData::Float(v) => buf.extend_from_slice(&v.to_le_bytes()),
        ValueData::Double(v) => buf.extend_from_slice(&v.to_le_bytes()),
        ValueData::String(v) => buf.extend_from_slice(v.as_bytes()),
        ValueData::BooleanArray(v) => buf.extend(v.iter().map(|b| u8::from(*b))),
        ValueData::IntegerArray(v) => v.iter().for_each(|x| buf.extend_from_slice(&x.to_le_bytes())),
        ValueData::FloatArray(v) => v.iter().for_each(|x| buf.extend_from_slice(&x.to_le_bytes())),
        ValueData::DoubleArray(v) => v.iter().for_each(|x| buf.extend_from_slice(&x.to_le_bytes())),
        ValueData::StringArray(v) => {
            buf.extend_from_slice(&len_u32(v.len())?.to_le_bytes());
            for s in v {
                push_str(&mut buf, s)?;
            }
        }
    }
    Ok(buf)
}

fn fixed<const N: usize>(payload: &[u8], what: &str) -> Result<[u8; N], LogError> {
    payload
        .try_into()
        .map_err(|_| LogError::malformed(format!("{what} payload must be {N} bytes, got {}", payload.len())))
}

fn elements<const N: usize, T>(
    payload: &[u8],
    what: &str,
    decode: impl Fn([u8; N]) -> T,
) -> Result<Vec<T>, LogError> {
    if payload.len() % N != 0 {
        return Err(LogError::malformed(format!(
            "{what} payload length {} is not a multiple of {N}",
            payload.len()
        )));
    }
    payload
        .chunks_exact(N)
        .map(|c| fixed::<N>(c, what).map(&decode))
        .collect()
}

/// Decode a payload of shape `ty`.
pub fn decode_payload(ty: LoggableType, payload: &[u8]) -> Result<ValueData, LogError> {
    Ok(match ty {
        LoggableType::Raw => ValueData::Raw(payload.to_vec()),
        LoggableType::Boolean => ValueData::Boolean(fixed::<1>(payload, "boolean")?[0] != 0),
        LoggableType::Integer => ValueData::Integer(i64::from_le_bytes(fixed(payload, "int64")?)),
        LoggableType::Float => ValueData::Float(f32::from_le_bytes(fixed(payload, "float")?)),
        LoggableType::Double => ValueData::Double(f64::from_le_bytes(fixed(payload, "double")?)),
        LoggableType::String => ValueData::String(
            String::from_utf8(payload.to_vec())
                .map_err(|e| LogError::malformed(format!("invalid UTF-8 string: {e}")))?,
        ),
        LoggableType::BooleanArray => {
            ValueData::BooleanArray(payload.iter().map(|b| *b != 0).collect())
        }
        LoggableType::IntegerArray => {
            ValueData::IntegerArray(elements(payload, "int64[]", i64::from_le_bytes)?)
        }
        LoggableType::FloatArray => {
            ValueData::FloatArray(elements(payload, "float[]", f32::from_le_bytes)?)
        }
        LoggableType::DoubleArray => {
            ValueData::DoubleArray(elements(payload, "double[]", f64::from_le_bytes)?)
        }
        LoggableType::StringArray => {
            let mut r = payload;
            let count = truncated(read_u32_le(&mut r), "string[] count")? as usize;
            let mut out = Vec::with_capacity(count.min(payload.len()));
            for _ in 0..count {
                out.push(truncated(read_length_prefixed_str(&mut r), "string[] element")?);
            }
            ValueData::StringArray(out)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roundtrip(record: &Record) -> Record {
        let mut buf = Vec::new();
        encode_record(&mut buf, record).unwrap();
        let mut r = buf.as_slice();
        let got = decode_record(&mut r).unwrap().unwrap();
        assert!(r.is_empty(), "trailing bytes after record");
        got
    }

    #[test]
    fn byte_widths() {
        assert_eq!(byte_width(0), 1);
        assert_eq!(byte_width(255), 1);
        assert_eq!(byte_width(256), 2);
        assert_eq!(byte_width(u64::from(u32::MAX)), 4);
        assert_eq!(byte_width(u64::MAX), 8);
    }

    #[test]
    fn header_roundtrip() {
        let mut buf = Vec::new();
        encode_header(&mut buf, "cyclelog").unwrap();
        assert_eq!(&buf[..6], b"WPILOG");
        assert_eq!(&buf[6..8], &[0x00, 0x01]);
        assert_eq!(decode_header(&mut buf.as_slice()).unwrap(), "cyclelog");
    }

    #[test]
    fn header_rejects_bad_magic_and_version() {
        let err = decode_header(&mut &b"WPILOX\x00\x01\x00\x00\x00\x00"[..]).unwrap_err();
        assert!(matches!(err, LogError::InvalidMagic));

        let err = decode_header(&mut &b"WPI"[..]).unwrap_err();
        assert!(matches!(err, LogError::InvalidMagic));

        let err = decode_header(&mut &b"WPILOG\x00\x02\x00\x00\x00\x00"[..]).unwrap_err();
        assert!(matches!(err, LogError::UnsupportedVersion { found: 0x0200 }));
    }

    #[test]
    fn record_header_uses_minimal_widths() {
        let mut buf = Vec::new();
        let rec = Record::Data {
            entry: 1,
            timestamp: 1000,
            payload: vec![1],
        };
        encode_record(&mut buf, &rec).unwrap();
        // entry 1 byte, size 1 byte, timestamp 2 bytes
        assert_eq!(buf[0], 0b0001_0000);
        assert_eq!(buf.len(), 1 + 1 + 1 + 2 + 1);
    }

    #[test]
    fn control_records_roundtrip() {
        let start = Record::Start {
            entry: 300,
            name: "/Timestamp".into(),
            type_name: "int64".into(),
            metadata: "{}".into(),
            timestamp: 0,
        };
        assert_eq!(roundtrip(&start), start);

        let finish = Record::Finish {
            entry: 7,
            timestamp: 99,
        };
        assert_eq!(roundtrip(&finish), finish);

        let meta = Record::SetMetadata {
            entry: 7,
            metadata: "{\"unit\":\"V\"}".into(),
            timestamp: 1 << 40,
        };
        assert_eq!(roundtrip(&meta), meta);
    }

    #[test]
    fn data_record_on_entry_zero_is_rejected() {
        let mut buf = Vec::new();
        let rec = Record::Data {
            entry: 0,
            timestamp: 0,
            payload: vec![],
        };
        assert!(encode_record(&mut buf, &rec).is_err());
    }

    #[test]
    fn clean_eof_vs_truncation() {
        assert!(decode_record(&mut &[][..]).unwrap().is_none());

        let mut buf = Vec::new();
        encode_record(
            &mut buf,
            &Record::Data {
                entry: 1,
                timestamp: 5,
                payload: vec![1, 2, 3, 4],
            },
        )
        .unwrap();
        buf.truncate(buf.len() - 2);
        let err = decode_record(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, LogError::MalformedRecord { .. }), "{err}");
    }

    #[test]
    fn unknown_control_type_is_malformed() {
        let mut buf = Vec::new();
        encode_raw_record(&mut buf, 0, 0, &[9, 1, 0, 0, 0]).unwrap();
        assert!(matches!(
            decode_record(&mut buf.as_slice()),
            Err(LogError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn string_array_payload_layout() {
        let data = ValueData::StringArray(vec!["ab".into(), String::new()]);
        let bytes = encode_payload(&data).unwrap();
        assert_eq!(
            bytes,
            vec![2, 0, 0, 0, 2, 0, 0, 0, b'a', b'b', 0, 0, 0, 0]
        );
        assert_eq!(
            decode_payload(LoggableType::StringArray, &bytes).unwrap(),
            data
        );
    }

    #[test]
    fn wrong_payload_size_is_malformed() {
        assert!(decode_payload(LoggableType::Double, &[0; 4]).is_err());
        assert!(decode_payload(LoggableType::IntegerArray, &[0; 9]).is_err());
        assert!(decode_payload(LoggableType::StringArray, &[5, 0, 0, 0]).is_err());
    }

    fn arb_data() -> impl Strategy<Value = ValueData> {
        prop_oneof![
            prop::collection::vec(any::<u8>(), 0..32).prop_map(ValueData::Raw),
            any::<bool>().prop_map(ValueData::Boolean),
            any::<i64>().prop_map(ValueData::Integer),
            any::<f32>().prop_map(ValueData::Float),
            any::<f64>().prop_map(ValueData::Double),
            ".{0,16}".prop_map(ValueData::String),
            prop::collection::vec(any::<bool>(), 0..8).prop_map(ValueData::BooleanArray),
            prop::collection::vec(any::<i64>(), 0..8).prop_map(ValueData::IntegerArray),
            prop::collection::vec(any::<f32>(), 0..8).prop_map(ValueData::FloatArray),
            prop::collection::vec(any::<f64>(), 0..8).prop_map(ValueData::DoubleArray),
            prop::collection::vec(".{0,6}", 0..5).prop_map(ValueData::StringArray),
        ]
    }

    proptest! {
        #[test]
        fn payload_roundtrip(data in arb_data()) {
            let bytes = encode_payload(&data).unwrap();
            let got = decode_payload(data.loggable_type(), &bytes).unwrap();
            prop_assert_eq!(got, data);
        }

        #[test]
        fn data_record_roundtrip(entry in 1u32.., timestamp in any::<u64>(), payload in prop::collection::vec(any::<u8>(), 0..300)) {
            let rec = Record::Data { entry, timestamp, payload };
            prop_assert_eq!(roundtrip(&rec), rec);
        }
    }
}
