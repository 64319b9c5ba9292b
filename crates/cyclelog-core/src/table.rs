//! The per-cycle structured record.
//!
//! A [`Table`] is a cheap handle: a key prefix and a depth over shared
//! state (the backing map, the timestamp cell and a rejected-write
//! counter). Sub-scopes created with [`Table::subtable`] are views over
//! the same state, so a write through any handle is visible through all
//! of them. Snapshots for background sinks are taken with
//! [`Table::deep_copy`].

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;

use crate::error::TableError;
use crate::keys::{MAX_DEPTH, SCHEMA_PREFIX, SCHEMA_TYPE};
use crate::loggable::{LogEnum, Loggable, StructSerializable};
use crate::units::Measure;
use crate::value::{FromValue, Value};

#[derive(Debug)]
struct Shared {
    timestamp: AtomicI64,
    data: Mutex<IndexMap<String, Value>>,
    rejected_writes: AtomicU64,
}

/// Hierarchical, typed key/value record for one control cycle.
///
/// Keys passed to `put*`/`get*` are relative to the handle's prefix; the
/// backing map stores absolute keys. Each key's declared type is fixed by
/// its first write (see [`Table::try_put_value`]).
///
/// # Examples
///
/// ```
/// use cyclelog_core::Table;
///
/// let root = Table::new(1_000);
/// let drive = root.subtable("Drive");
/// drive.put("LeftVolts", 11.5);
///
/// assert_eq!(drive.prefix(), "/Drive/");
/// assert_eq!(root.get("Drive/LeftVolts", 0.0), 11.5);
/// assert_eq!(drive.timestamp(), 1_000);
/// ```
#[derive(Clone, Debug)]
pub struct Table {
    prefix: String,
    depth: u32,
    shared: Arc<Shared>,
}

impl Table {
    /// A new, empty root table at `timestamp` (microseconds).
    pub fn new(timestamp: i64) -> Self {
        Self::with_data(timestamp, IndexMap::new())
    }

    fn with_data(timestamp: i64, data: IndexMap<String, Value>) -> Self {
        Self {
            prefix: "/".to_owned(),
            depth: 0,
            shared: Arc::new(Shared {
                timestamp: AtomicI64::new(timestamp),
                data: Mutex::new(data),
                rejected_writes: AtomicU64::new(0),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<String, Value>> {
        self.shared
            .data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn absolute(&self, key: &str) -> String {
        let mut full = String::with_capacity(self.prefix.len() + key.len());
        full.push_str(&self.prefix);
        full.push_str(key);
        full
    }

    // ── Scope ───────────────────────────────────────────────────

    /// A view under `name`, sharing this table's map and timestamp.
    pub fn subtable(&self, name: &str) -> Table {
        Table {
            prefix: format!("{}{}/", self.prefix, name),
            depth: self.depth + 1,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Absolute prefix of this view, always ending in `/`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Number of [`subtable`](Table::subtable) steps from the root.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Whether `other` is a view over the same backing state.
    pub fn shares_state_with(&self, other: &Table) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    // ── Timestamp ───────────────────────────────────────────────

    /// Logical cycle time in microseconds.
    pub fn timestamp(&self) -> i64 {
        self.shared.timestamp.load(Ordering::Acquire)
    }

    /// Set the cycle time seen by every view of this table.
    pub fn set_timestamp(&self, timestamp: i64) {
        self.shared.timestamp.store(timestamp, Ordering::Release);
    }

    // ── Raw values ──────────────────────────────────────────────

    /// Write `value` at `key`, enforcing the key's declared type.
    ///
    /// The first write to a key fixes its shape and custom type. A later
    /// write with a different shape or custom type is refused and the
    /// stored value is left untouched.
    pub fn try_put_value(&self, key: &str, value: Value) -> Result<(), TableError> {
        let full = self.absolute(key);
        let mut data = self.lock();
        if let Some(existing) = data.get(&full) {
            if !existing.same_declared_type(&value) {
                return Err(TableError::TypeMismatch {
                    key: full,
                    expected: existing.wire_type().to_owned(),
                    attempted: value.wire_type().to_owned(),
                });
            }
        }
        data.insert(full, value);
        Ok(())
    }

    /// Write `value` at `key`. A rejected write is warned about and
    /// counted; returns whether the write was applied.
    pub fn put_value(&self, key: &str, value: Value) -> bool {
        match self.try_put_value(key, value) {
            Ok(()) => true,
            Err(err) => {
                self.reject(&err);
                false
            }
        }
    }

    fn reject(&self, err: &TableError) {
        self.shared.rejected_writes.fetch_add(1, Ordering::Relaxed);
        tracing::warn!("{err}");
    }

    /// Write any value convertible into a [`Value`].
    pub fn put(&self, key: &str, value: impl Into<Value>) -> bool {
        self.put_value(key, value.into())
    }

    /// The stored value at `key`, if any.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.lock().get(&self.absolute(key)).cloned()
    }

    /// Remove `key` and its declared type, returning the stored value.
    /// A later write to `key` may use any type.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.lock().shift_remove(&self.absolute(key))
    }

    /// Whether `key` has been written.
    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().contains_key(&self.absolute(key))
    }

    /// The value at `key` as `T`, or `default` when missing or of
    /// another shape.
    pub fn get<T: FromValue>(&self, key: &str, default: T) -> T {
        self.get_value(key)
            .and_then(|v| T::from_value(&v))
            .unwrap_or(default)
    }

    /// Every entry, or only those under this view's prefix.
    ///
    /// With `subtable_only` the returned keys are relative to the prefix;
    /// otherwise they are absolute.
    pub fn get_all(&self, subtable_only: bool) -> IndexMap<String, Value> {
        let data = self.lock();
        if !subtable_only {
            return data.clone();
        }
        data.iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(self.prefix.as_str())
                    .map(|rel| (rel.to_owned(), v.clone()))
            })
            .collect()
    }

    /// Number of entries in the backing map.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the backing map is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Writes refused so far across every view of this table.
    pub fn rejected_writes(&self) -> u64 {
        self.shared.rejected_writes.load(Ordering::Relaxed)
    }

    /// An independent root table holding a copy of the current entries
    /// and timestamp. Later writes to either table are not shared.
    pub fn deep_copy(&self) -> Table {
        Self::with_data(self.timestamp(), self.lock().clone())
    }

    // ── Measures ────────────────────────────────────────────────

    /// Write a measure as a double in its base unit, annotated with the
    /// base unit's symbol.
    pub fn put_measure(&self, key: &str, measure: Measure) -> bool {
        let base = measure.to_base();
        self.put_value(
            key,
            Value::double(base.magnitude()).with_unit(base.unit().symbol()),
        )
    }

    /// Read a measure stored in base units, expressed in `default`'s unit.
    pub fn get_measure(&self, key: &str, default: Measure) -> Measure {
        match self.get_value(key).and_then(|v| v.as_double()) {
            Some(base) => Measure::new(base / default.unit().to_base_factor(), default.unit()),
            None => default,
        }
    }

    // ── Enums ───────────────────────────────────────────────────

    /// Write an enum by variant name.
    pub fn put_enum<E: LogEnum>(&self, key: &str, value: E) -> bool {
        self.put_value(key, Value::string(value.name()))
    }

    /// Read an enum by variant name; unknown names yield `default`.
    pub fn get_enum<E: LogEnum>(&self, key: &str, default: E) -> E {
        self.get_value(key)
            .and_then(|v| v.as_str().and_then(E::from_name))
            .unwrap_or(default)
    }

    /// Write enums as a string array of variant names.
    pub fn put_enum_array<E: LogEnum>(&self, key: &str, values: &[E]) -> bool {
        let names: Vec<&str> = values.iter().map(|e| e.name()).collect();
        self.put_value(key, Value::from(names))
    }

    /// Read an enum array; names that no longer parse are skipped.
    pub fn get_enum_array<E: LogEnum>(&self, key: &str, default: Vec<E>) -> Vec<E> {
        match self.get_value(key) {
            Some(v) => match v.as_string_array() {
                Some(names) => names.iter().filter_map(|n| E::from_name(n)).collect(),
                None => default,
            },
            None => default,
        }
    }

    // ── Structs ─────────────────────────────────────────────────

    /// Write a struct as packed bytes typed `struct:<name>`, registering
    /// its schema on first use.
    pub fn put_struct<S: StructSerializable>(&self, key: &str, value: &S) -> bool {
        self.add_struct_schema::<S>();
        let mut buf = Vec::with_capacity(S::SIZE);
        value.pack(&mut buf);
        self.put_value(key, Value::raw(buf).with_custom_type(S::type_string()))
    }

    /// Write a struct slice as concatenated packed bytes typed
    /// `struct:<name>[]`.
    pub fn put_struct_array<S: StructSerializable>(&self, key: &str, values: &[S]) -> bool {
        self.add_struct_schema::<S>();
        let mut buf = Vec::with_capacity(S::SIZE * values.len());
        for value in values {
            value.pack(&mut buf);
        }
        self.put_value(
            key,
            Value::raw(buf).with_custom_type(format!("{}[]", S::type_string())),
        )
    }

    /// Read a packed struct, or `default` when missing or undecodable.
    pub fn get_struct<S: StructSerializable>(&self, key: &str, default: S) -> S {
        self.get_value(key)
            .and_then(|v| v.as_raw().and_then(S::unpack))
            .unwrap_or(default)
    }

    /// Read a packed struct array. A trailing partial element is ignored.
    pub fn get_struct_array<S: StructSerializable>(&self, key: &str, default: Vec<S>) -> Vec<S> {
        let Some(value) = self.get_value(key) else {
            return default;
        };
        let Some(bytes) = value.as_raw() else {
            return default;
        };
        if S::SIZE == 0 {
            return Vec::new();
        }
        bytes.chunks_exact(S::SIZE).filter_map(S::unpack).collect()
    }

    fn add_struct_schema<S: StructSerializable>(&self) {
        let mut data = self.lock();
        let key = format!("{SCHEMA_PREFIX}{}", S::type_string());
        if data.contains_key(&key) {
            return;
        }
        data.insert(
            key,
            Value::raw(S::schema().into_bytes()).with_custom_type(SCHEMA_TYPE),
        );
        S::for_each_nested_schema(&mut |type_name, schema| {
            data.entry(format!("{SCHEMA_PREFIX}struct:{type_name}"))
                .or_insert_with(|| {
                    Value::raw(schema.as_bytes().to_vec()).with_custom_type(SCHEMA_TYPE)
                });
        });
    }

    // ── Nested objects ──────────────────────────────────────────

    /// Log a nested object under the subtable `key`.
    ///
    /// Refused (with a warning) once this view is deeper than the
    /// recursion limit, which stops self-referential object graphs.
    pub fn put_loggable(&self, key: &str, value: &dyn Loggable) -> bool {
        if self.depth > MAX_DEPTH {
            self.reject(&TableError::RecursionLimit {
                key: self.absolute(key),
                depth: self.depth,
            });
            return false;
        }
        value.to_log(&self.subtable(key));
        true
    }

    /// Restore a nested object from the subtable `key`.
    pub fn read_loggable(&self, key: &str, value: &mut dyn Loggable) {
        value.from_log(&self.subtable(key));
    }

    /// Write a list of rows as `key/length` plus one entry per row at
    /// `key/<index>`.
    pub fn put_nested<V>(&self, key: &str, rows: &[V]) -> bool
    where
        V: Clone + Into<Value>,
    {
        let len = i64::try_from(rows.len()).unwrap_or(i64::MAX);
        let mut ok = self.put(&format!("{key}/length"), len);
        for (i, row) in rows.iter().enumerate() {
            ok &= self.put(&format!("{key}/{i}"), row.clone());
        }
        ok
    }

    /// Read rows written by [`put_nested`](Table::put_nested). Missing
    /// rows read as `V::default()`.
    pub fn get_nested<V>(&self, key: &str, default: Vec<V>) -> Vec<V>
    where
        V: FromValue + Default,
    {
        let Some(len) = self
            .get_value(&format!("{key}/length"))
            .and_then(|v| v.as_integer())
        else {
            return default;
        };
        (0..len.max(0))
            .map(|i| self.get(&format!("{key}/{i}"), V::default()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Unit;

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Point {
        x: f64,
        y: f64,
    }

    impl StructSerializable for Point {
        const TYPE_NAME: &'static str = "Point";
        const SIZE: usize = 16;

        fn schema() -> String {
            "double x;double y".to_owned()
        }

        fn pack(&self, out: &mut Vec<u8>) {
            out.extend_from_slice(&self.x.to_le_bytes());
            out.extend_from_slice(&self.y.to_le_bytes());
        }

        fn unpack(data: &[u8]) -> Option<Self> {
            let x = f64::from_le_bytes(data.get(0..8)?.try_into().ok()?);
            let y = f64::from_le_bytes(data.get(8..16)?.try_into().ok()?);
            Some(Self { x, y })
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Segment {
        a: Point,
        b: Point,
    }

    impl StructSerializable for Segment {
        const TYPE_NAME: &'static str = "Segment";
        const SIZE: usize = 32;

        fn schema() -> String {
            "Point a;Point b".to_owned()
        }

        fn pack(&self, out: &mut Vec<u8>) {
            self.a.pack(out);
            self.b.pack(out);
        }

        fn unpack(data: &[u8]) -> Option<Self> {
            Some(Self {
                a: Point::unpack(data.get(0..16)?)?,
                b: Point::unpack(data.get(16..32)?)?,
            })
        }

        fn for_each_nested_schema(visit: &mut dyn FnMut(&str, &str)) {
            visit(Point::TYPE_NAME, &Point::schema());
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Gear {
        Low,
        High,
    }

    impl LogEnum for Gear {
        fn name(self) -> &'static str {
            match self {
                Gear::Low => "Low",
                Gear::High => "High",
            }
        }

        fn from_name(name: &str) -> Option<Self> {
            match name {
                "Low" => Some(Gear::Low),
                "High" => Some(Gear::High),
                _ => None,
            }
        }
    }

    struct SelfNesting;

    impl Loggable for SelfNesting {
        fn to_log(&self, table: &Table) {
            table.put("Depth", i64::from(table.depth()));
            table.put_loggable("Inner", self);
        }

        fn from_log(&mut self, _table: &Table) {}
    }

    #[test]
    fn subtable_prefix_and_depth() {
        let root = Table::new(0);
        assert_eq!(root.prefix(), "/");
        assert_eq!(root.depth(), 0);
        let arm = root.subtable("Arm").subtable("Wrist");
        assert_eq!(arm.prefix(), "/Arm/Wrist/");
        assert_eq!(arm.depth(), 2);
        assert!(arm.shares_state_with(&root));
    }

    #[test]
    fn subtables_share_data_and_timestamp() {
        let root = Table::new(5);
        let sub = root.subtable("Sub");
        sub.put("X", 3i64);
        assert_eq!(root.get("Sub/X", 0i64), 3);
        root.set_timestamp(99);
        assert_eq!(sub.timestamp(), 99);
    }

    #[test]
    fn mismatched_type_is_rejected_and_original_kept() {
        let table = Table::new(0);
        assert!(table.put("Speed", 1.5));
        assert!(!table.put("Speed", "fast"));
        assert_eq!(table.get("Speed", 0.0), 1.5);
        assert_eq!(table.rejected_writes(), 1);

        let err = table.try_put_value("Speed", Value::integer(1)).unwrap_err();
        assert_eq!(
            err,
            TableError::TypeMismatch {
                key: "/Speed".into(),
                expected: "double".into(),
                attempted: "int64".into(),
            }
        );
    }

    #[test]
    fn custom_type_is_part_of_declared_type() {
        let table = Table::new(0);
        assert!(table.put_value("Cfg", Value::string("{}").with_custom_type("json")));
        assert!(!table.put_value("Cfg", Value::string("{}")));
        assert!(table.put_value("Cfg", Value::string("{\"a\":1}").with_custom_type("json")));
    }

    #[test]
    fn remove_clears_declared_type() {
        let table = Table::new(0);
        let sub = table.subtable("Arm");
        sub.put("Mode", 1i64);
        assert_eq!(sub.remove("Mode"), Some(Value::integer(1)));
        assert!(!table.contains_key("Arm/Mode"));
        assert!(sub.put("Mode", "Stowed"));
        assert_eq!(table.get("Arm/Mode", String::new()), "Stowed");
        assert_eq!(sub.remove("Missing"), None);
    }

    #[test]
    fn same_type_overwrites() {
        let table = Table::new(0);
        table.put("N", 1i64);
        table.put("N", 2i64);
        assert_eq!(table.get("N", 0i64), 2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn get_missing_or_mistyped_returns_default() {
        let table = Table::new(0);
        assert_eq!(table.get("Nope", 7i64), 7);
        table.put("Flag", true);
        assert_eq!(table.get("Flag", 1.25), 1.25);
        assert!(table.get("Flag", false));
    }

    #[test]
    fn get_all_subtable_only_strips_prefix() {
        let root = Table::new(0);
        root.put("Top", 1i64);
        let x = root.subtable("X");
        x.put("A", 2i64);
        x.subtable("Deep").put("B", 3i64);
        root.put("XY", 4i64);

        let scoped = x.get_all(true);
        let keys: Vec<&str> = scoped.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["A", "Deep/B"]);

        let all = root.get_all(false);
        assert_eq!(all.len(), 4);
        assert!(all.contains_key("/X/Deep/B"));
    }

    #[test]
    fn deep_copy_is_independent() {
        let table = Table::new(10);
        table.put("A", 1i64);
        let snap = table.deep_copy();
        table.put("A", 2i64);
        table.set_timestamp(20);
        assert_eq!(snap.get("A", 0i64), 1);
        assert_eq!(snap.timestamp(), 10);
        assert!(!snap.shares_state_with(&table));
    }

    #[test]
    fn measures_are_stored_in_base_units() {
        let table = Table::new(0);
        table.put_measure("Height", Measure::new(100.0, Unit::Centimeters));
        let raw = table.get_value("Height").unwrap();
        assert_eq!(raw.as_double(), Some(1.0));
        assert_eq!(raw.unit(), Some("m"));

        let back = table.get_measure("Height", Measure::new(0.0, Unit::Millimeters));
        assert_eq!(back.unit(), Unit::Millimeters);
        assert!((back.magnitude() - 1000.0).abs() < 1e-9);

        let missing = table.get_measure("Nope", Measure::new(3.0, Unit::Feet));
        assert_eq!(missing, Measure::new(3.0, Unit::Feet));
    }

    #[test]
    fn enums_round_trip_by_name() {
        let table = Table::new(0);
        table.put_enum("Gear", Gear::High);
        assert_eq!(table.get("Gear", String::new()), "High");
        assert_eq!(table.get_enum("Gear", Gear::Low), Gear::High);

        table.put_enum_array("Gears", &[Gear::Low, Gear::High]);
        assert_eq!(
            table.get_enum_array::<Gear>("Gears", vec![]),
            vec![Gear::Low, Gear::High]
        );

        table.put("Bogus", "Reverse");
        assert_eq!(table.get_enum("Bogus", Gear::Low), Gear::Low);
    }

    #[test]
    fn struct_schema_registered_once_with_nested_types() {
        let table = Table::new(0).subtable("Robot");
        let seg = Segment {
            a: Point { x: 1.0, y: 2.0 },
            b: Point { x: 3.0, y: 4.0 },
        };
        table.put_struct("Seg", &seg);
        table.put_struct("Seg", &seg);

        let schema = table.get_all(false);
        let seg_schema = &schema["/.schema/struct:Segment"];
        assert_eq!(seg_schema.custom_type(), Some("structschema"));
        assert_eq!(seg_schema.as_raw(), Some("Point a;Point b".as_bytes()));
        assert!(schema.contains_key("/.schema/struct:Point"));
        assert_eq!(
            schema["/Robot/Seg"].wire_type(),
            "struct:Segment"
        );

        let back = table.get_struct("Seg", Segment { a: Point { x: 0.0, y: 0.0 }, b: Point { x: 0.0, y: 0.0 } });
        assert_eq!(back, seg);
    }

    #[test]
    fn struct_arrays_use_array_type_string() {
        let table = Table::new(0);
        let pts = [Point { x: 1.0, y: 2.0 }, Point { x: -1.0, y: 0.5 }];
        table.put_struct_array("Path", &pts);
        let v = table.get_value("Path").unwrap();
        assert_eq!(v.wire_type(), "struct:Point[]");
        assert_eq!(v.as_raw().map(<[u8]>::len), Some(32));
        assert_eq!(table.get_struct_array::<Point>("Path", vec![]), pts.to_vec());
    }

    #[test]
    fn recursion_guard_stops_self_nesting() {
        let table = Table::new(0);
        assert!(table.put_loggable("Loop", &SelfNesting));
        assert_eq!(table.rejected_writes(), 1);

        let depths = table.get_all(false);
        let deepest = depths
            .values()
            .filter_map(Value::as_integer)
            .max()
            .unwrap();
        assert_eq!(deepest, i64::from(MAX_DEPTH) + 1);
    }

    #[test]
    fn nested_rows_round_trip() {
        let table = Table::new(0);
        let rows = vec![vec![1.0, 2.0], vec![], vec![3.0]];
        table.put_nested("Rows", &rows);
        assert_eq!(table.get("Rows/length", 0i64), 3);
        assert_eq!(table.get_nested::<Vec<f64>>("Rows", vec![]), rows);
        assert_eq!(
            table.get_nested::<Vec<f64>>("Missing", vec![vec![9.0]]),
            vec![vec![9.0]]
        );
    }
}
