//! Record-to-disk and read-back integration tests.
//!
//! Each test: build tables → write through LogWriter or the file sink →
//! read back through LogReader or the replay source → compare fields.

use cyclelog_core::{DataReceiver, ReplaySource, Table, Value};
use cyclelog_wpilog::{LogReader, LogWriter, WpilogConfig, WpilogReader, WpilogWriter, EXTRA_HEADER};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────

fn encode(tables: &[Table]) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut writer = LogWriter::new(&mut buf, EXTRA_HEADER).unwrap();
    for t in tables {
        writer.write_table(t).unwrap();
    }
    drop(writer);
    buf
}

fn decode(buf: &[u8]) -> Vec<Table> {
    LogReader::open(buf)
        .unwrap()
        .cycles()
        .collect::<Result<_, _>>()
        .unwrap()
}

// ── Scenario ────────────────────────────────────────────────────

#[test]
fn enabled_match_voltage_scenario_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scenario.wpilog");

    let table = Table::new(1000);
    table.put("Enabled", true);
    table.put("MatchNumber", 42i64);
    table.put_value("Voltage", Value::double(12.3).with_unit("V"));

    let mut sink = WpilogWriter::new(WpilogConfig::new(&path));
    sink.start().unwrap();
    sink.put_table(&table.deep_copy()).unwrap();
    sink.end().unwrap();

    let mut source = WpilogReader::new(&path);
    source.start().unwrap();
    let replay = Table::new(0);
    assert!(source.update_table(&replay).unwrap());

    assert_eq!(replay.timestamp(), 1000);
    assert!(replay.get("Enabled", false));
    assert_eq!(replay.get("MatchNumber", 0i64), 42);
    assert_eq!(replay.get("Voltage", 0.0), 12.3);
    assert_eq!(replay.get_value("Voltage").unwrap().unit(), Some("V"));

    assert!(!source.update_table(&replay).unwrap());
    source.end();
}

#[test]
fn foreign_file_fails_to_start() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("other.wpilog");
    let mut bytes = b"WPILOG\x00\x01".to_vec();
    bytes.extend_from_slice(&5u32.to_le_bytes());
    bytes.extend_from_slice(b"other");
    std::fs::write(&path, bytes).unwrap();

    let mut source = WpilogReader::new(&path);
    let err = source.start().unwrap_err();
    assert!(err.to_string().contains("not produced by cyclelog"), "{err}");
}

#[test]
fn missing_file_fails_to_start() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = WpilogReader::new(dir.path().join("absent.wpilog"));
    assert!(source.start().is_err());
}

#[test]
fn auto_named_file_is_renamed_with_match_info() {
    let dir = tempfile::tempdir().unwrap();
    let config = WpilogConfig {
        path: dir.path().to_path_buf(),
        assume_time_valid: true,
        ..WpilogConfig::default()
    };
    let mut sink = WpilogWriter::new(config);
    sink.start().unwrap();
    let first = sink.path();
    assert!(first.exists());

    let table = Table::new(0);
    table.put("DriverStation/MatchType", 1i64);
    table.put("DriverStation/MatchNumber", 3i64);
    sink.put_table(&table).unwrap();
    sink.end().unwrap();

    let renamed = sink.path();
    assert_ne!(first, renamed);
    assert!(!first.exists());
    assert!(renamed.exists());
    let name = renamed.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.ends_with("_p3.wpilog"), "{name}");

    let cycles = decode(&std::fs::read(&renamed).unwrap());
    assert_eq!(cycles.len(), 1);
}

#[test]
fn existing_file_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.wpilog");
    std::fs::write(&path, b"stale").unwrap();

    let mut sink = WpilogWriter::new(WpilogConfig::new(&path));
    sink.start().unwrap();
    sink.end().unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"WPILOG"));
    assert!(decode(&bytes).is_empty());
}

// ── Properties ──────────────────────────────────────────────────

fn arb_field() -> impl Strategy<Value = (usize, Value)> {
    (
        0usize..4,
        prop_oneof![
            any::<bool>().prop_map(Value::boolean),
            any::<i64>().prop_map(Value::integer),
            any::<f64>().prop_map(Value::double),
            "[a-z]{0,8}".prop_map(Value::string),
            prop::collection::vec(any::<f32>(), 0..4).prop_map(Value::from),
        ],
    )
}

proptest! {
    /// Every decoded cycle carries exactly the fields live when it was
    /// written, with the same values.
    #[test]
    fn n_cycles_roundtrip(cycles in prop::collection::vec(prop::collection::vec(arb_field(), 0..6), 1..8)) {
        let live = Table::new(0);
        let mut snapshots = Vec::new();
        for (i, fields) in cycles.iter().enumerate() {
            live.set_timestamp(i as i64 * 20_000);
            for (slot, value) in fields {
                // One key per shape so the declared type never changes.
                let key = format!("S{slot}/{}", value.wire_type());
                live.put_value(&key, value.clone());
            }
            snapshots.push(live.deep_copy());
        }

        let decoded = decode(&encode(&snapshots));
        prop_assert_eq!(decoded.len(), snapshots.len());
        for (want, got) in snapshots.iter().zip(&decoded) {
            prop_assert_eq!(want.timestamp(), got.timestamp());
            prop_assert_eq!(want.get_all(false), got.get_all(false));
        }
    }
}
