//! Per-entry metadata carried in start and set-metadata records.

use serde::{Deserialize, Serialize};

use crate::SOURCE;

/// JSON metadata attached to every entry this crate writes.
///
/// # Examples
///
/// ```
/// use cyclelog_wpilog::EntryMetadata;
///
/// let plain = EntryMetadata::new(None);
/// assert_eq!(plain.to_json(), r#"{"source":"cyclelog"}"#);
///
/// let volts = EntryMetadata::new(Some("V"));
/// assert_eq!(volts.to_json(), r#"{"source":"cyclelog","unit":"V"}"#);
/// assert_eq!(EntryMetadata::parse(&volts.to_json()).unit.as_deref(), Some("V"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Producer tag.
    #[serde(default)]
    pub source: String,
    /// Physical unit of the entry's values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl EntryMetadata {
    /// Metadata tagged with this producer and an optional unit.
    pub fn new(unit: Option<&str>) -> Self {
        Self {
            source: SOURCE.to_owned(),
            unit: unit.map(str::to_owned),
        }
    }

    /// Serialize to the JSON form written into the log.
    pub fn to_json(&self) -> String {
        // A struct of two strings always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse metadata leniently: logs from other tools may carry empty or
    /// non-JSON metadata, which reads as "no unit".
    pub fn parse(metadata: &str) -> Self {
        serde_json::from_str(metadata).unwrap_or_default()
    }
}
