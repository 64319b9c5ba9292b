//! Typed log values and their wire/telemetry type names.
//!
//! A [`Value`] is a closed sum over eleven payload shapes ([`ValueData`])
//! plus two optional annotations: a custom type string that overrides the
//! wire type name (struct payloads, JSON, enums) and a physical unit.

use std::fmt;

// ── LoggableType ────────────────────────────────────────────────

/// Shape of a [`Value`] payload.
///
/// The discriminant order matches the wire and telemetry type tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoggableType {
    /// Opaque byte buffer.
    Raw,
    /// Single boolean.
    Boolean,
    /// Signed 64-bit integer.
    Integer,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// UTF-8 string.
    String,
    /// Array of booleans.
    BooleanArray,
    /// Array of signed 64-bit integers.
    IntegerArray,
    /// Array of 32-bit floats.
    FloatArray,
    /// Array of 64-bit floats.
    DoubleArray,
    /// Array of UTF-8 strings.
    StringArray,
}

const WIRE_TYPES: [&str; 11] = [
    "raw", "boolean", "int64", "float", "double", "string", "boolean[]", "int64[]", "float[]",
    "double[]", "string[]",
];

const TELEMETRY_TYPES: [&str; 11] = [
    "raw", "boolean", "int", "float", "double", "string", "boolean[]", "int[]", "float[]",
    "double[]", "string[]",
];

impl LoggableType {
    /// Every shape, in wire-table order.
    pub const ALL: [LoggableType; 11] = [
        Self::Raw,
        Self::Boolean,
        Self::Integer,
        Self::Float,
        Self::Double,
        Self::String,
        Self::BooleanArray,
        Self::IntegerArray,
        Self::FloatArray,
        Self::DoubleArray,
        Self::StringArray,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Type name written into binary log start records (e.g. `"int64"`).
    pub fn wire_type(self) -> &'static str {
        WIRE_TYPES[self.index()]
    }

    /// Type name used when announcing live telemetry topics (e.g. `"int"`).
    pub fn telemetry_type(self) -> &'static str {
        TELEMETRY_TYPES[self.index()]
    }

    /// Resolve a wire type name. Unknown names (custom struct types,
    /// `"json"`, ...) are carried as raw bytes, so they map to `None` here
    /// and the caller decides the fallback.
    pub fn from_wire_type(name: &str) -> Option<Self> {
        WIRE_TYPES
            .iter()
            .position(|t| *t == name)
            .map(|i| Self::ALL[i])
    }
}

impl fmt::Display for LoggableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_type())
    }
}

// ── ValueData ───────────────────────────────────────────────────

/// Payload of a [`Value`].
#[derive(Clone, Debug)]
pub enum ValueData {
    /// Opaque byte buffer.
    Raw(Vec<u8>),
    /// Single boolean.
    Boolean(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Array of booleans.
    BooleanArray(Vec<bool>),
    /// Array of signed 64-bit integers.
    IntegerArray(Vec<i64>),
    /// Array of 32-bit floats.
    FloatArray(Vec<f32>),
    /// Array of 64-bit floats.
    DoubleArray(Vec<f64>),
    /// Array of UTF-8 strings.
    StringArray(Vec<String>),
}

impl ValueData {
    /// The shape of this payload.
    pub fn loggable_type(&self) -> LoggableType {
        match self {
            Self::Raw(_) => LoggableType::Raw,
            Self::Boolean(_) => LoggableType::Boolean,
            Self::Integer(_) => LoggableType::Integer,
            Self::Float(_) => LoggableType::Float,
            Self::Double(_) => LoggableType::Double,
            Self::String(_) => LoggableType::String,
            Self::BooleanArray(_) => LoggableType::BooleanArray,
            Self::IntegerArray(_) => LoggableType::IntegerArray,
            Self::FloatArray(_) => LoggableType::FloatArray,
            Self::DoubleArray(_) => LoggableType::DoubleArray,
            Self::StringArray(_) => LoggableType::StringArray,
        }
    }
}

// Floats compare by bit pattern: replay must reproduce the exact bits,
// and a NaN field must not look "changed" every cycle.
impl PartialEq for ValueData {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Raw(a), Self::Raw(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::String(a), Self::String(b)) => a == b,
            (Self::BooleanArray(a), Self::BooleanArray(b)) => a == b,
            (Self::IntegerArray(a), Self::IntegerArray(b)) => a == b,
            (Self::FloatArray(a), Self::FloatArray(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (Self::DoubleArray(a), Self::DoubleArray(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (Self::StringArray(a), Self::StringArray(b)) => a == b,
            _ => false,
        }
    }
}

// ── Value ───────────────────────────────────────────────────────

/// A single logged field: payload plus optional type and unit annotations.
///
/// # Examples
///
/// ```
/// use cyclelog_core::{LoggableType, Value};
///
/// let v = Value::double(12.3).with_unit("V");
/// assert_eq!(v.loggable_type(), LoggableType::Double);
/// assert_eq!(v.unit(), Some("V"));
/// assert_eq!(v.wire_type(), "double");
/// assert_eq!(v, Value::double(12.3));
/// ```
#[derive(Clone, Debug)]
pub struct Value {
    data: ValueData,
    custom_type: String,
    unit: String,
}

impl Value {
    /// Wrap a payload with no annotations.
    pub fn new(data: ValueData) -> Self {
        Self {
            data,
            custom_type: String::new(),
            unit: String::new(),
        }
    }

    /// Raw byte payload.
    pub fn raw(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(ValueData::Raw(bytes.into()))
    }

    /// Boolean payload.
    pub fn boolean(v: bool) -> Self {
        Self::new(ValueData::Boolean(v))
    }

    /// Integer payload.
    pub fn integer(v: i64) -> Self {
        Self::new(ValueData::Integer(v))
    }

    /// 32-bit float payload.
    pub fn float(v: f32) -> Self {
        Self::new(ValueData::Float(v))
    }

    /// 64-bit float payload.
    pub fn double(v: f64) -> Self {
        Self::new(ValueData::Double(v))
    }

    /// String payload.
    pub fn string(v: impl Into<String>) -> Self {
        Self::new(ValueData::String(v.into()))
    }

    /// Override the wire type name (e.g. `"struct:Pose2d"`, `"json"`).
    pub fn with_custom_type(mut self, custom_type: impl Into<String>) -> Self {
        self.custom_type = custom_type.into();
        self
    }

    /// Attach a physical unit annotation (e.g. `"V"`).
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// The payload shape.
    pub fn loggable_type(&self) -> LoggableType {
        self.data.loggable_type()
    }

    /// Borrow the payload.
    pub fn data(&self) -> &ValueData {
        &self.data
    }

    /// Take the payload.
    pub fn into_data(self) -> ValueData {
        self.data
    }

    /// Custom wire type, if one was set.
    pub fn custom_type(&self) -> Option<&str> {
        (!self.custom_type.is_empty()).then_some(self.custom_type.as_str())
    }

    /// Unit annotation, if one was set.
    pub fn unit(&self) -> Option<&str> {
        (!self.unit.is_empty()).then_some(self.unit.as_str())
    }

    /// Type name for binary log start records.
    pub fn wire_type(&self) -> &str {
        self.custom_type()
            .unwrap_or_else(|| self.loggable_type().wire_type())
    }

    /// Type name for live telemetry topics.
    pub fn telemetry_type(&self) -> &str {
        self.custom_type()
            .unwrap_or_else(|| self.loggable_type().telemetry_type())
    }

    /// Whether a later write of `other` to the same key is allowed:
    /// same shape and identical custom type.
    pub fn same_declared_type(&self, other: &Value) -> bool {
        self.loggable_type() == other.loggable_type() && self.custom_type == other.custom_type
    }

    /// Raw bytes, if this is a raw value.
    pub fn as_raw(&self) -> Option<&[u8]> {
        match &self.data {
            ValueData::Raw(v) => Some(v),
            _ => None,
        }
    }

    /// Boolean, if this is a boolean value.
    pub fn as_boolean(&self) -> Option<bool> {
        match self.data {
            ValueData::Boolean(v) => Some(v),
            _ => None,
        }
    }

    /// Integer, if this is an integer value.
    pub fn as_integer(&self) -> Option<i64> {
        match self.data {
            ValueData::Integer(v) => Some(v),
            _ => None,
        }
    }

    /// Float, if this is a 32-bit float value.
    pub fn as_float(&self) -> Option<f32> {
        match self.data {
            ValueData::Float(v) => Some(v),
            _ => None,
        }
    }

    /// Double, if this is a 64-bit float value.
    pub fn as_double(&self) -> Option<f64> {
        match self.data {
            ValueData::Double(v) => Some(v),
            _ => None,
        }
    }

    /// String slice, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match &self.data {
            ValueData::String(v) => Some(v),
            _ => None,
        }
    }

    /// Boolean array, if this is a boolean array value.
    pub fn as_boolean_array(&self) -> Option<&[bool]> {
        match &self.data {
            ValueData::BooleanArray(v) => Some(v),
            _ => None,
        }
    }

    /// Integer array, if this is an integer array value.
    pub fn as_integer_array(&self) -> Option<&[i64]> {
        match &self.data {
            ValueData::IntegerArray(v) => Some(v),
            _ => None,
        }
    }

    /// Float array, if this is a 32-bit float array value.
    pub fn as_float_array(&self) -> Option<&[f32]> {
        match &self.data {
            ValueData::FloatArray(v) => Some(v),
            _ => None,
        }
    }

    /// Double array, if this is a 64-bit float array value.
    pub fn as_double_array(&self) -> Option<&[f64]> {
        match &self.data {
            ValueData::DoubleArray(v) => Some(v),
            _ => None,
        }
    }

    /// String array, if this is a string array value.
    pub fn as_string_array(&self) -> Option<&[String]> {
        match &self.data {
            ValueData::StringArray(v) => Some(v),
            _ => None,
        }
    }
}

fn annotations_compatible(a: &str, b: &str) -> bool {
    a.is_empty() || b.is_empty() || a == b
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.loggable_type() == other.loggable_type()
            && annotations_compatible(&self.custom_type, &other.custom_type)
            && annotations_compatible(&self.unit, &other.unit)
            && self.data == other.data
    }
}

impl From<ValueData> for Value {
    fn from(data: ValueData) -> Self {
        Self::new(data)
    }
}

// ── Conversions into Value ──────────────────────────────────────

macro_rules! integer_into_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Self::integer(i64::from(v))
                }
            }
        )*
    };
}

integer_into_value!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::boolean(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::string(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::string(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Self::string(v.as_str())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Self::raw(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::raw(v)
    }
}

impl From<Vec<bool>> for Value {
    fn from(v: Vec<bool>) -> Self {
        Self::new(ValueData::BooleanArray(v))
    }
}

impl From<&[bool]> for Value {
    fn from(v: &[bool]) -> Self {
        Self::new(ValueData::BooleanArray(v.to_vec()))
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Self::new(ValueData::IntegerArray(v))
    }
}

impl From<&[i64]> for Value {
    fn from(v: &[i64]) -> Self {
        Self::new(ValueData::IntegerArray(v.to_vec()))
    }
}

impl From<Vec<i32>> for Value {
    fn from(v: Vec<i32>) -> Self {
        Self::new(ValueData::IntegerArray(v.into_iter().map(i64::from).collect()))
    }
}

impl From<&[i32]> for Value {
    fn from(v: &[i32]) -> Self {
        Self::new(ValueData::IntegerArray(v.iter().copied().map(i64::from).collect()))
    }
}

impl From<Vec<f32>> for Value {
    fn from(v: Vec<f32>) -> Self {
        Self::new(ValueData::FloatArray(v))
    }
}

impl From<&[f32]> for Value {
    fn from(v: &[f32]) -> Self {
        Self::new(ValueData::FloatArray(v.to_vec()))
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Self::new(ValueData::DoubleArray(v))
    }
}

impl From<&[f64]> for Value {
    fn from(v: &[f64]) -> Self {
        Self::new(ValueData::DoubleArray(v.to_vec()))
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Self::new(ValueData::StringArray(v))
    }
}

impl From<&[String]> for Value {
    fn from(v: &[String]) -> Self {
        Self::new(ValueData::StringArray(v.to_vec()))
    }
}

impl From<Vec<&str>> for Value {
    fn from(v: Vec<&str>) -> Self {
        Self::new(ValueData::StringArray(
            v.into_iter().map(str::to_owned).collect(),
        ))
    }
}

impl From<&[&str]> for Value {
    fn from(v: &[&str]) -> Self {
        Self::new(ValueData::StringArray(
            v.iter().map(|s| (*s).to_owned()).collect(),
        ))
    }
}

// ── Conversions out of Value ────────────────────────────────────

/// Typed extraction used by [`Table::get`](crate::Table::get).
///
/// Returns `None` when the stored shape does not match the requested
/// Rust type, in which case the caller falls back to its default.
pub trait FromValue: Sized {
    /// Extract `Self` from a stored value.
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_boolean()
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_integer()
    }
}

macro_rules! narrow_integer_from_value {
    ($($t:ty),*) => {
        $(
            impl FromValue for $t {
                fn from_value(value: &Value) -> Option<Self> {
                    value.as_integer().and_then(|v| <$t>::try_from(v).ok())
                }
            }
        )*
    };
}

narrow_integer_from_value!(i8, i16, i32, u8, u16, u32, u64, usize);

impl FromValue for f32 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_float()
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_double()
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_raw().map(<[u8]>::to_vec)
    }
}

impl FromValue for Vec<bool> {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_boolean_array().map(<[bool]>::to_vec)
    }
}

impl FromValue for Vec<i64> {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_integer_array().map(<[i64]>::to_vec)
    }
}

impl FromValue for Vec<i32> {
    fn from_value(value: &Value) -> Option<Self> {
        value
            .as_integer_array()?
            .iter()
            .map(|v| i32::try_from(*v).ok())
            .collect()
    }
}

impl FromValue for Vec<f32> {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_float_array().map(<[f32]>::to_vec)
    }
}

impl FromValue for Vec<f64> {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_double_array().map(<[f64]>::to_vec)
    }
}

impl FromValue for Vec<String> {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_string_array().map(<[String]>::to_vec)
    }
}
