//! Temperature scales used by the probes.
//!
//! Every probe reports Celsius, Fahrenheit, Kelvin and Réaumur. The four values are
//! always derived from Celsius with fixed linear formulas, never sourced
//! independently:
//!
//! ```text
//! F = C * 9/5 + 32
//! K = C + 273.15
//! R = C * 4/5
//! ```

use serde::{Deserialize, Serialize};

/// Offset between the Celsius and Kelvin scales.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Temperature scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    /// Degrees Celsius (°C)
    Celsius,
    /// Degrees Fahrenheit (°F)
    Fahrenheit,
    /// Kelvin (K)
    Kelvin,
    /// Degrees Réaumur (°R)
    Reaumur,
}

impl Unit {
    /// All scales in wire/column order.
    pub const ALL: [Unit; 4] = [Unit::Celsius, Unit::Fahrenheit, Unit::Kelvin, Unit::Reaumur];

    /// Key used in the JSON payload.
    pub fn wire_key(self) -> &'static str {
        match self {
            Unit::Celsius => "C",
            Unit::Fahrenheit => "F",
            Unit::Kelvin => "K",
            Unit::Reaumur => "R",
        }
    }

    /// Display suffix.
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Celsius => "°C",
            Unit::Fahrenheit => "°F",
            Unit::Kelvin => "K",
            Unit::Reaumur => "°R",
        }
    }

    /// Convert a Celsius value into this scale.
    pub fn from_celsius(self, celsius: f64) -> f64 {
        match self {
            Unit::Celsius => celsius,
            Unit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
            Unit::Kelvin => celsius + KELVIN_OFFSET,
            Unit::Reaumur => celsius * 4.0 / 5.0,
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One probe's temperature in all four scales.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitValues {
    /// Celsius
    pub c: f64,
    /// Fahrenheit
    pub f: f64,
    /// Kelvin
    pub k: f64,
    /// Réaumur
    pub r: f64,
}

impl UnitValues {
    /// Derive all four scales from a Celsius value.
    pub fn from_celsius(celsius: f64) -> Self {
        Self {
            c: celsius,
            f: Unit::Fahrenheit.from_celsius(celsius),
            k: Unit::Kelvin.from_celsius(celsius),
            r: Unit::Reaumur.from_celsius(celsius),
        }
    }

    /// Value in the requested scale.
    pub fn get(&self, unit: Unit) -> f64 {
        match unit {
            Unit::Celsius => self.c,
            Unit::Fahrenheit => self.f,
            Unit::Kelvin => self.k,
            Unit::Reaumur => self.r,
        }
    }

    /// Values in [`Unit::ALL`] order.
    pub fn to_array(&self) -> [f64; 4] {
        [self.c, self.f, self.k, self.r]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_reference_points() {
        let freezing = UnitValues::from_celsius(0.0);
        assert_eq!(freezing.f, 32.0);
        assert_eq!(freezing.k, 273.15);
        assert_eq!(freezing.r, 0.0);

        let boiling = UnitValues::from_celsius(100.0);
        assert!((boiling.f - 212.0).abs() < 1e-9);
        assert!((boiling.k - 373.15).abs() < 1e-9);
        assert!((boiling.r - 80.0).abs() < 1e-9);
    }

    #[test]
    fn derivation_holds_across_range() {
        for step in -400..=1200 {
            let c = f64::from(step) * 0.25;
            let v = UnitValues::from_celsius(c);
            assert!((v.f - (c * 9.0 / 5.0 + 32.0)).abs() < 1e-9);
            assert!((v.k - (c + 273.15)).abs() < 1e-9);
            assert!((v.r - c * 4.0 / 5.0).abs() < 1e-9);
        }
    }

    #[test]
    fn get_matches_fields() {
        let v = UnitValues::from_celsius(37.5);
        for unit in Unit::ALL {
            assert_eq!(v.get(unit), unit.from_celsius(37.5));
        }
        assert_eq!(v.to_array(), [v.c, v.f, v.k, v.r]);
    }
}
