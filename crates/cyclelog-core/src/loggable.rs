//! Traits for values that log themselves into a [`Table`].

use crate::table::Table;

/// An object that serializes into, and restores from, a table scope.
///
/// This is the seam through which input producers (sensors, driver
/// station, dashboard widgets) take part in logging: in record mode the
/// logger calls [`to_log`](Loggable::to_log), in replay mode it calls
/// [`from_log`](Loggable::from_log) so the object reads recorded values
/// instead of live hardware.
pub trait Loggable {
    /// Write this object's fields into `table`.
    fn to_log(&self, table: &Table);

    /// Overwrite this object's fields from `table`.
    fn from_log(&mut self, table: &Table);
}

/// A fieldless enum logged by variant name.
///
/// # Examples
///
/// ```
/// use cyclelog_core::{LogEnum, Table};
///
/// #[derive(Clone, Copy, Debug, PartialEq)]
/// enum Mode { Auto, Teleop }
///
/// impl LogEnum for Mode {
///     fn name(self) -> &'static str {
///         match self { Mode::Auto => "Auto", Mode::Teleop => "Teleop" }
///     }
///     fn from_name(name: &str) -> Option<Self> {
///         match name { "Auto" => Some(Mode::Auto), "Teleop" => Some(Mode::Teleop), _ => None }
///     }
/// }
///
/// let table = Table::new(0);
/// table.put_enum("Mode", Mode::Teleop);
/// assert_eq!(table.get("Mode", String::new()), "Teleop");
/// assert_eq!(table.get_enum("Mode", Mode::Auto), Mode::Teleop);
/// ```
pub trait LogEnum: Copy {
    /// The variant name written to the log.
    fn name(self) -> &'static str;

    /// Parse a variant name back; `None` for unknown names.
    fn from_name(name: &str) -> Option<Self>;
}

/// A fixed-size composite packed into raw bytes with a published schema.
///
/// The schema string (e.g. `"double x;double y"`) is written once per
/// type under `/.schema/struct:<TYPE_NAME>` so offline tools can decode
/// the bytes without this crate.
pub trait StructSerializable: Sized {
    /// Type name, without the `struct:` prefix.
    const TYPE_NAME: &'static str;

    /// Packed size in bytes.
    const SIZE: usize;

    /// Field layout description.
    fn schema() -> String;

    /// Append exactly [`SIZE`](StructSerializable::SIZE) bytes to `out`.
    fn pack(&self, out: &mut Vec<u8>);

    /// Decode from exactly [`SIZE`](StructSerializable::SIZE) bytes.
    fn unpack(data: &[u8]) -> Option<Self>;

    /// Visit the `(type_name, schema)` of every struct type nested
    /// inside this one. Types without nested structs keep the default.
    fn for_each_nested_schema(_visit: &mut dyn FnMut(&str, &str)) {}

    /// The wire type string, `struct:<TYPE_NAME>`.
    fn type_string() -> String {
        format!("struct:{}", Self::TYPE_NAME)
    }
}
