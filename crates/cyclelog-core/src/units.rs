//! Physically dimensioned values.
//!
//! Measures are logged in the base unit of their dimension (metres,
//! seconds, radians, ...) with the base unit symbol as the value's unit
//! annotation. Conversion to and from display units happens at the
//! boundary, never in the log.

use std::fmt;

/// Physical dimension of a [`Unit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dimension {
    /// Length.
    Distance,
    /// Time.
    Time,
    /// Plane angle.
    Angle,
    /// Length per time.
    LinearVelocity,
    /// Angle per time.
    AngularVelocity,
    /// Electric potential.
    Voltage,
    /// Electric current.
    Current,
    /// Mass.
    Mass,
    /// Power.
    Power,
}

/// A unit of measure with a fixed linear factor to its base unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Unit {
    /// Metres (base distance).
    Meters,
    /// Centimetres.
    Centimeters,
    /// Millimetres.
    Millimeters,
    /// Inches.
    Inches,
    /// Feet.
    Feet,
    /// Seconds (base time).
    Seconds,
    /// Milliseconds.
    Milliseconds,
    /// Microseconds.
    Microseconds,
    /// Minutes.
    Minutes,
    /// Radians (base angle).
    Radians,
    /// Degrees.
    Degrees,
    /// Full rotations.
    Rotations,
    /// Metres per second (base linear velocity).
    MetersPerSecond,
    /// Feet per second.
    FeetPerSecond,
    /// Radians per second (base angular velocity).
    RadiansPerSecond,
    /// Degrees per second.
    DegreesPerSecond,
    /// Rotations per minute.
    RotationsPerMinute,
    /// Volts (base voltage).
    Volts,
    /// Millivolts.
    Millivolts,
    /// Amperes (base current).
    Amps,
    /// Milliamperes.
    Milliamps,
    /// Kilograms (base mass).
    Kilograms,
    /// Pounds.
    Pounds,
    /// Watts (base power).
    Watts,
}

impl Unit {
    /// Short symbol written as the unit annotation.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Meters => "m",
            Self::Centimeters => "cm",
            Self::Millimeters => "mm",
            Self::Inches => "in",
            Self::Feet => "ft",
            Self::Seconds => "s",
            Self::Milliseconds => "ms",
            Self::Microseconds => "us",
            Self::Minutes => "min",
            Self::Radians => "rad",
            Self::Degrees => "deg",
            Self::Rotations => "rot",
            Self::MetersPerSecond => "m/s",
            Self::FeetPerSecond => "ft/s",
            Self::RadiansPerSecond => "rad/s",
            Self::DegreesPerSecond => "deg/s",
            Self::RotationsPerMinute => "rpm",
            Self::Volts => "V",
            Self::Millivolts => "mV",
            Self::Amps => "A",
            Self::Milliamps => "mA",
            Self::Kilograms => "kg",
            Self::Pounds => "lb",
            Self::Watts => "W",
        }
    }

    /// The dimension this unit measures.
    pub fn dimension(self) -> Dimension {
        match self {
            Self::Meters | Self::Centimeters | Self::Millimeters | Self::Inches | Self::Feet => {
                Dimension::Distance
            }
            Self::Seconds | Self::Milliseconds | Self::Microseconds | Self::Minutes => {
                Dimension::Time
            }
            Self::Radians | Self::Degrees | Self::Rotations => Dimension::Angle,
            Self::MetersPerSecond | Self::FeetPerSecond => Dimension::LinearVelocity,
            Self::RadiansPerSecond | Self::DegreesPerSecond | Self::RotationsPerMinute => {
                Dimension::AngularVelocity
            }
            Self::Volts | Self::Millivolts => Dimension::Voltage,
            Self::Amps | Self::Milliamps => Dimension::Current,
            Self::Kilograms | Self::Pounds => Dimension::Mass,
            Self::Watts => Dimension::Power,
        }
    }

    /// The base unit of this unit's dimension.
    pub fn base(self) -> Unit {
        match self.dimension() {
            Dimension::Distance => Self::Meters,
            Dimension::Time => Self::Seconds,
            Dimension::Angle => Self::Radians,
            Dimension::LinearVelocity => Self::MetersPerSecond,
            Dimension::AngularVelocity => Self::RadiansPerSecond,
            Dimension::Voltage => Self::Volts,
            Dimension::Current => Self::Amps,
            Dimension::Mass => Self::Kilograms,
            Dimension::Power => Self::Watts,
        }
    }

    /// Multiply a magnitude in this unit by this factor to get base units.
    pub fn to_base_factor(self) -> f64 {
        use std::f64::consts::TAU;
        match self {
            Self::Meters
            | Self::Seconds
            | Self::Radians
            | Self::MetersPerSecond
            | Self::RadiansPerSecond
            | Self::Volts
            | Self::Amps
            | Self::Kilograms
            | Self::Watts => 1.0,
            Self::Centimeters => 0.01,
            Self::Millimeters | Self::Milliseconds | Self::Millivolts | Self::Milliamps => 1e-3,
            Self::Inches => 0.0254,
            Self::Feet => 0.3048,
            Self::Microseconds => 1e-6,
            Self::Minutes => 60.0,
            Self::Degrees | Self::DegreesPerSecond => TAU / 360.0,
            Self::Rotations => TAU,
            Self::FeetPerSecond => 0.3048,
            Self::RotationsPerMinute => TAU / 60.0,
            Self::Pounds => 0.453_592_37,
        }
    }

    /// Look up a unit by its symbol.
    pub fn from_symbol(symbol: &str) -> Option<Unit> {
        ALL_UNITS.iter().copied().find(|u| u.symbol() == symbol)
    }
}

const ALL_UNITS: [Unit; 24] = [
    Unit::Meters,
    Unit::Centimeters,
    Unit::Millimeters,
    Unit::Inches,
    Unit::Feet,
    Unit::Seconds,
    Unit::Milliseconds,
    Unit::Microseconds,
    Unit::Minutes,
    Unit::Radians,
    Unit::Degrees,
    Unit::Rotations,
    Unit::MetersPerSecond,
    Unit::FeetPerSecond,
    Unit::RadiansPerSecond,
    Unit::DegreesPerSecond,
    Unit::RotationsPerMinute,
    Unit::Volts,
    Unit::Millivolts,
    Unit::Amps,
    Unit::Milliamps,
    Unit::Kilograms,
    Unit::Pounds,
    Unit::Watts,
];

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A magnitude paired with its unit.
///
/// # Examples
///
/// ```
/// use cyclelog_core::{Measure, Unit};
///
/// let d = Measure::new(12.0, Unit::Inches);
/// assert!((d.in_base() - 0.3048).abs() < 1e-12);
/// assert_eq!(d.to_base().unit(), Unit::Meters);
/// assert!((d.in_unit(Unit::Feet).unwrap() - 1.0).abs() < 1e-12);
/// assert_eq!(d.in_unit(Unit::Seconds), None);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Measure {
    magnitude: f64,
    unit: Unit,
}

impl Measure {
    /// A magnitude in `unit`.
    pub fn new(magnitude: f64, unit: Unit) -> Self {
        Self { magnitude, unit }
    }

    /// The magnitude in this measure's own unit.
    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    /// This measure's unit.
    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// The magnitude expressed in the base unit.
    pub fn in_base(&self) -> f64 {
        self.magnitude * self.unit.to_base_factor()
    }

    /// The same quantity expressed in the base unit.
    pub fn to_base(&self) -> Measure {
        Measure::new(self.in_base(), self.unit.base())
    }

    /// The magnitude in `unit`, or `None` across dimensions.
    pub fn in_unit(&self, unit: Unit) -> Option<f64> {
        (unit.dimension() == self.unit.dimension())
            .then(|| self.in_base() / unit.to_base_factor())
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.magnitude, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_units_have_unit_factor() {
        for unit in ALL_UNITS {
            assert_eq!(unit.base().to_base_factor(), 1.0, "{unit}");
            assert_eq!(unit.base().base(), unit.base());
        }
    }

    #[test]
    fn symbols_are_unique_and_resolvable() {
        for unit in ALL_UNITS {
            assert_eq!(Unit::from_symbol(unit.symbol()), Some(unit));
        }
        assert_eq!(Unit::from_symbol("furlong"), None);
    }

    #[test]
    fn angle_conversions() {
        let half_turn = Measure::new(180.0, Unit::Degrees);
        assert!((half_turn.in_base() - std::f64::consts::PI).abs() < 1e-12);
        assert!((half_turn.in_unit(Unit::Rotations).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rpm_to_radians_per_second() {
        let m = Measure::new(60.0, Unit::RotationsPerMinute);
        assert!((m.in_base() - std::f64::consts::TAU).abs() < 1e-12);
    }
}
