//! Reusable loggable fixtures.
//!
//! - [`GyroInputs`]: a sensor input object.
//! - [`Pose2d`]: a struct-serializable composite.
//! - [`DriveMode`]: a log enum.
//! - [`DriverStationCollector`]: a collector writing match metadata.

use cyclelog_core::{LogEnum, Loggable, StructSerializable, Table};
use cyclelog_engine::HardwareCollector;

/// Gyro readings logged as an input object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GyroInputs {
    pub connected: bool,
    pub yaw_deg: f64,
    pub rate_dps: f64,
}

impl Loggable for GyroInputs {
    fn to_log(&self, table: &Table) {
        table.put("Connected", self.connected);
        table.put("YawDeg", self.yaw_deg);
        table.put("RateDps", self.rate_dps);
    }

    fn from_log(&mut self, table: &Table) {
        self.connected = table.get("Connected", self.connected);
        self.yaw_deg = table.get("YawDeg", self.yaw_deg);
        self.rate_dps = table.get("RateDps", self.rate_dps);
    }
}

/// Planar pose packed as three little-endian doubles.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pose2d {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
}

impl StructSerializable for Pose2d {
    const TYPE_NAME: &'static str = "Pose2d";
    const SIZE: usize = 24;

    fn schema() -> String {
        "double x;double y;double heading".to_owned()
    }

    fn pack(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.x.to_le_bytes());
        out.extend_from_slice(&self.y.to_le_bytes());
        out.extend_from_slice(&self.heading.to_le_bytes());
    }

    fn unpack(data: &[u8]) -> Option<Self> {
        let read = |i: usize| -> Option<f64> {
            Some(f64::from_le_bytes(data.get(i * 8..i * 8 + 8)?.try_into().ok()?))
        };
        Some(Self {
            x: read(0)?,
            y: read(1)?,
            heading: read(2)?,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriveMode {
    Disabled,
    Auto,
    Teleop,
}

impl LogEnum for DriveMode {
    fn name(self) -> &'static str {
        match self {
            DriveMode::Disabled => "Disabled",
            DriveMode::Auto => "Auto",
            DriveMode::Teleop => "Teleop",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "Disabled" => Some(DriveMode::Disabled),
            "Auto" => Some(DriveMode::Auto),
            "Teleop" => Some(DriveMode::Teleop),
            _ => None,
        }
    }
}

/// Writes fixed match metadata under `DriverStation`, and remembers the
/// enabled flag it last replayed.
#[derive(Clone, Debug, Default)]
pub struct DriverStationCollector {
    pub enabled: bool,
    pub match_type: i64,
    pub match_number: i64,
    pub replayed_enabled: Option<bool>,
}

impl HardwareCollector for DriverStationCollector {
    fn name(&self) -> &str {
        "DriverStation"
    }

    fn save_to_log(&mut self, table: &Table) {
        table.put("Enabled", self.enabled);
        table.put("MatchType", self.match_type);
        table.put("MatchNumber", self.match_number);
    }

    fn replay_from_log(&mut self, table: &Table) {
        self.replayed_enabled = Some(table.get("Enabled", false));
    }
}
